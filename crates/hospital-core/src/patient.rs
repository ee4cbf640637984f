//! Patient aggregate workflow.
//!
//! Reads assemble a [`PatientRecord`] from five tables: one query for the
//! base rows, then four per patient (history, chronic diseases, drug
//! allergies, latest appointment). Listing K patients therefore runs
//! 1 + 4K statements, one after another.
//!
//! Writes insert or update the Patient row and then replace the junction
//! links. Whether those statements share a transaction is decided by the
//! configured [`WriteMode`].

use hospital_storage::{
    Delete, DynRecordStore, Filter, Insert, Join, Row, Select, StorageError, StorageResult, Update,
};
use tracing::{debug, info, instrument};

use crate::error::{ServiceError, ServiceResult};
use crate::mapping::{RowReader, is_valid_link_id, parse_date, parse_time, require};
use crate::models::{
    Appointment, ChronicDiseaseName, DrugAllergyName, MedicalHistory, NewAppointment,
    NewMedicalHistory, PatientGeneralInfo, PatientInput, PatientRecord, PatientRequest,
    PatientSearch,
};
use crate::writer::{WriteMode, WriteScope};

const PATIENT: &str = "Patient";
const MEDICAL_HISTORY: &str = "Medical_history";
const CHRONIC_DISEASE: &str = "patient_chronic_disease";
const DRUG_ALLERGY: &str = "patient_drug_allergy";
const APPOINTMENT: &str = "patient_appointment";

/// Reads and writes composite patient records.
#[derive(Clone)]
pub struct PatientService {
    store: DynRecordStore,
    write_mode: WriteMode,
}

impl PatientService {
    /// Creates a service running composite writes sequentially.
    #[must_use]
    pub fn new(store: DynRecordStore) -> Self {
        Self {
            store,
            write_mode: WriteMode::default(),
        }
    }

    /// Sets how composite writes execute.
    #[must_use]
    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    /// Configured write mode.
    #[must_use]
    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    // ==================== Reads ====================

    /// Fetches one patient with all sub-records.
    ///
    /// # Errors
    ///
    /// `NotFound` when no patient has this id.
    #[instrument(skip(self))]
    pub async fn get_patient(&self, patient_id: &str) -> ServiceResult<PatientRecord> {
        let rows = self
            .store
            .select(&Select::from(PATIENT).filter(Filter::eq("patient_id", patient_id)))
            .await?;

        let Some(row) = rows.first() else {
            return Err(ServiceError::not_found("Patient"));
        };
        self.assemble(row).await
    }

    /// Searches patients by exact id and case-insensitive name substrings.
    /// Blank filters match everything.
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing matches.
    #[instrument(skip(self))]
    pub async fn search_patients(&self, search: &PatientSearch) -> ServiceResult<Vec<PatientRecord>> {
        let query = Select::from(PATIENT)
            .filter(Filter::optional_eq("patient_id", search.patient_id.trim()))
            .filter(Filter::optional_contains("first_name", search.first_name.trim()))
            .filter(Filter::optional_contains("last_name", search.last_name.trim()))
            .order_by_desc("patient_id");

        let rows = self.store.select(&query).await?;
        if rows.is_empty() {
            return Err(ServiceError::not_found("Patient"));
        }
        self.assemble_all(&rows).await
    }

    /// Lists every patient, newest id first. An empty table is an empty list.
    #[instrument(skip(self))]
    pub async fn list_patients(&self) -> ServiceResult<Vec<PatientRecord>> {
        let rows = self
            .store
            .select(&Select::from(PATIENT).order_by_desc("patient_id"))
            .await?;
        self.assemble_all(&rows).await
    }

    async fn assemble_all(&self, rows: &[Row]) -> ServiceResult<Vec<PatientRecord>> {
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(self.assemble(row).await?);
        }
        debug!(count = records.len(), "patients assembled");
        Ok(records)
    }

    async fn assemble(&self, row: &Row) -> ServiceResult<PatientRecord> {
        let general_info = map_general_info(row)?;
        let id = general_info.patient_id.as_str();

        let history = self
            .store
            .select(&Select::from(MEDICAL_HISTORY).filter(Filter::eq("patient_id", id)))
            .await?;
        let medical_history = history
            .iter()
            .map(map_history)
            .collect::<StorageResult<Vec<_>>>()?;

        let chronic_diseases = self
            .store
            .select(
                &Select::from(CHRONIC_DISEASE)
                    .columns(["disease.disease_name"])
                    .join(Join::new(
                        "disease",
                        "patient_chronic_disease.disease_id",
                        "disease.disease_id",
                    ))
                    .filter(Filter::eq("patient_chronic_disease.patient_id", id)),
            )
            .await?
            .iter()
            .map(|r| ChronicDiseaseName {
                disease_name: RowReader::new(r).text("disease_name"),
            })
            .collect();

        let drug_allergies = self
            .store
            .select(
                &Select::from(DRUG_ALLERGY)
                    .columns(["drug.drug_name"])
                    .join(Join::new(
                        "drug",
                        "patient_drug_allergy.drug_id",
                        "drug.drug_id",
                    ))
                    .filter(Filter::eq("patient_drug_allergy.patient_id", id)),
            )
            .await?
            .iter()
            .map(|r| DrugAllergyName {
                drug_name: RowReader::new(r).text("drug_name"),
            })
            .collect();

        let latest = self
            .store
            .select(
                &Select::from(APPOINTMENT)
                    .filter(Filter::eq("patient_id", id))
                    .order_by_desc("date")
                    .order_by_desc("time")
                    .limit(1),
            )
            .await?;
        let appointment = match latest.first() {
            Some(r) => map_appointment(r)?,
            None => Appointment::default(),
        };

        Ok(PatientRecord {
            general_info,
            appointment,
            medical_history,
            chronic_diseases,
            drug_allergies,
        })
    }

    // ==================== Writes ====================

    /// Inserts a patient, then each valid chronic-disease and drug-allergy
    /// link. Link ids that are blank, `undefined` or `null` are skipped.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank patient_id or a malformed date of birth;
    /// otherwise the first failing statement.
    #[instrument(skip(self, request), fields(patient_id = %request.patient.patient_id))]
    pub async fn add_patient(&self, request: &PatientRequest) -> ServiceResult<()> {
        let insert = patient_insert(&request.patient)?;

        let mut scope = WriteScope::begin(self.store.as_ref(), self.write_mode).await?;
        let outcome = async {
            scope.insert(&insert).await?;
            insert_links(&mut scope, request).await?;
            Ok::<_, ServiceError>(())
        }
        .await;
        let outcome = scope.finish(outcome).await;

        if outcome.is_ok() {
            info!("patient added");
        }
        outcome
    }

    /// Merges the submitted non-empty fields into the Patient row and
    /// replaces both link sets.
    ///
    /// Returns the Patient rows updated plus one per inserted link.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank patient_id or a malformed date of birth;
    /// otherwise the first failing statement.
    #[instrument(skip(self, request), fields(patient_id = %request.patient.patient_id))]
    pub async fn update_patient(&self, request: &PatientRequest) -> ServiceResult<u64> {
        let patient_id = request.patient.patient_id.trim();
        require("patient_id", patient_id)?;
        let update = patient_update(patient_id, &request.patient)?;

        let mut scope = WriteScope::begin(self.store.as_ref(), self.write_mode).await?;
        let outcome = async {
            let mut affected = 0;
            if !update.is_empty() {
                affected += scope.update(&update).await?;
            }

            let by_patient = Filter::eq("patient_id", patient_id);
            let removed_diseases = scope
                .delete(&Delete::from(CHRONIC_DISEASE).filter(by_patient.clone()))
                .await?;
            let removed_allergies = scope
                .delete(&Delete::from(DRUG_ALLERGY).filter(by_patient))
                .await?;
            debug!(removed_diseases, removed_allergies, "previous links removed");

            affected += insert_links(&mut scope, request).await?;
            Ok::<_, ServiceError>(affected)
        }
        .await;
        let outcome = scope.finish(outcome).await;

        if let Ok(affected) = outcome {
            info!(affected, "patient updated");
        }
        outcome
    }

    /// Records an appointment.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank patient_id or malformed date/time.
    #[instrument(skip(self, appointment), fields(patient_id = %appointment.patient_id))]
    pub async fn add_appointment(&self, appointment: &NewAppointment) -> ServiceResult<u64> {
        require("patient_id", &appointment.patient_id)?;
        let statement = Insert::into(APPOINTMENT)
            .value("patient_id", appointment.patient_id.trim())
            .value("date", parse_date("date", &appointment.date)?)
            .value("time", parse_time("time", &appointment.time)?)
            .value("topic", appointment.topic.as_str());

        Ok(self.store.insert(&statement).await?)
    }

    /// Appends a medical history entry.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank patient_id or malformed date/time.
    #[instrument(skip(self, entry), fields(patient_id = %entry.patient_id))]
    pub async fn add_medical_history(&self, entry: &NewMedicalHistory) -> ServiceResult<u64> {
        require("patient_id", &entry.patient_id)?;
        let statement = Insert::into(MEDICAL_HISTORY)
            .value("patient_id", entry.patient_id.trim())
            .value("detail", entry.detail.as_str())
            .value("date", parse_date("date", &entry.date)?)
            .value("time", parse_time("time", &entry.time)?);

        Ok(self.store.insert(&statement).await?)
    }
}

/// Inserts the valid links of `request`, returning how many were written.
async fn insert_links(scope: &mut WriteScope<'_>, request: &PatientRequest) -> ServiceResult<u64> {
    let patient_id = request.patient.patient_id.trim();
    let mut inserted = 0;

    for link in &request.chronic_diseases {
        if !is_valid_link_id(&link.disease_id) {
            continue;
        }
        scope
            .insert(
                &Insert::into(CHRONIC_DISEASE)
                    .value("patient_id", patient_id)
                    .value("disease_id", link.disease_id.trim()),
            )
            .await?;
        inserted += 1;
    }

    for link in &request.drug_allergies {
        if !is_valid_link_id(&link.drug_id) {
            continue;
        }
        scope
            .insert(
                &Insert::into(DRUG_ALLERGY)
                    .value("patient_id", patient_id)
                    .value("drug_id", link.drug_id.trim()),
            )
            .await?;
        inserted += 1;
    }

    Ok(inserted)
}

fn patient_insert(p: &PatientInput) -> ServiceResult<Insert> {
    require("patient_id", &p.patient_id)?;
    let date_of_birth = parse_date("date_of_birth", &p.date_of_birth)?;

    Ok(Insert::into(PATIENT)
        .value("patient_id", p.patient_id.trim())
        .value("first_name", p.first_name.as_str())
        .value("last_name", p.last_name.as_str())
        .value("age", p.age.unwrap_or(0))
        .value("date_of_birth", date_of_birth)
        .value("gender", p.gender.as_str())
        .value("blood_type", p.blood_type.as_str())
        .value("email", p.email.as_str())
        .value("health_insurance", p.health_insurance.as_str())
        .value("address", p.address.as_str())
        .value("phone_number", p.phone_number.as_str())
        .value("id_card_number", p.id_card_number.as_str())
        .value("ongoing_treatment", p.ongoing_treatment.as_str())
        .value("unhealthy_habits", p.unhealthy_habits.as_str()))
}

fn patient_update(patient_id: &str, p: &PatientInput) -> ServiceResult<Update> {
    let mut update = Update::table(PATIENT).filter(Filter::eq("patient_id", patient_id));

    let text_fields = [
        ("first_name", &p.first_name),
        ("last_name", &p.last_name),
        ("health_insurance", &p.health_insurance),
        ("gender", &p.gender),
        ("blood_type", &p.blood_type),
        ("email", &p.email),
        ("address", &p.address),
        ("phone_number", &p.phone_number),
        ("id_card_number", &p.id_card_number),
        ("ongoing_treatment", &p.ongoing_treatment),
        ("unhealthy_habits", &p.unhealthy_habits),
    ];
    for (column, value) in text_fields {
        if !value.is_empty() {
            update = update.set(column, value.as_str());
        }
    }

    if !p.date_of_birth.is_empty() {
        update = update.set("date_of_birth", parse_date("date_of_birth", &p.date_of_birth)?);
    }
    if let Some(age) = p.age {
        update = update.set("age", age);
    }

    Ok(update)
}

fn map_general_info(row: &Row) -> StorageResult<PatientGeneralInfo> {
    let r = RowReader::new(row);
    let age = r.integer("age")?;

    Ok(PatientGeneralInfo {
        patient_id: r.text("patient_id"),
        first_name: r.text("first_name"),
        last_name: r.text("last_name"),
        age: i32::try_from(age).map_err(|_| {
            StorageError::decode("age", format!("{age} is out of range"))
        })?,
        date_of_birth: r.date("date_of_birth")?,
        gender: r.text("gender"),
        blood_type: r.text("blood_type"),
        email: r.text("email"),
        health_insurance: r.text("health_insurance"),
        address: r.text("address"),
        phone_number: r.text("phone_number"),
        id_card_number: r.text("id_card_number"),
        ongoing_treatment: r.text("ongoing_treatment"),
        unhealthy_habits: r.text("unhealthy_habits"),
    })
}

fn map_history(row: &Row) -> StorageResult<MedicalHistory> {
    let r = RowReader::new(row);
    Ok(MedicalHistory {
        details: r.text("detail"),
        date: r.date("date")?,
        time: r.time("time")?,
    })
}

fn map_appointment(row: &Row) -> StorageResult<Appointment> {
    let r = RowReader::new(row);
    Ok(Appointment {
        date: r.date("date")?,
        time: r.time("time")?,
        topic: r.text("topic"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hospital_storage::SqlValue;

    #[test]
    fn update_writes_only_submitted_fields() {
        let input = PatientInput {
            patient_id: "P1".into(),
            first_name: "Janet".into(),
            ..Default::default()
        };
        let update = patient_update("P1", &input).unwrap();

        let columns: Vec<&str> = update.values().keys().map(String::as_str).collect();
        assert_eq!(columns, vec!["first_name"]);
    }

    #[test]
    fn explicit_zero_age_is_written() {
        let input = PatientInput {
            patient_id: "P1".into(),
            age: Some(0),
            ..Default::default()
        };
        let update = patient_update("P1", &input).unwrap();
        assert_eq!(update.values().get("age"), Some(&SqlValue::Integer(0)));
    }

    #[test]
    fn empty_update_is_detected() {
        let input = PatientInput {
            patient_id: "P1".into(),
            ..Default::default()
        };
        assert!(patient_update("P1", &input).unwrap().is_empty());
    }

    #[test]
    fn insert_requires_parsable_birth_date() {
        let input = PatientInput {
            patient_id: "P1".into(),
            date_of_birth: "someday".into(),
            ..Default::default()
        };
        assert!(patient_insert(&input).unwrap_err().is_validation());
    }
}
