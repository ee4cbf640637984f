use serde::{Deserialize, Serialize};

/// Demographics of one patient as returned to clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientGeneralInfo {
    #[serde(rename = "Patient_id")]
    pub patient_id: String,
    #[serde(rename = "First_name")]
    pub first_name: String,
    #[serde(rename = "Last_name")]
    pub last_name: String,
    #[serde(rename = "Age")]
    pub age: i32,
    #[serde(rename = "Date_of_birth")]
    pub date_of_birth: String,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Blood_type")]
    pub blood_type: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Health_insurance")]
    pub health_insurance: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Phone_number")]
    pub phone_number: String,
    #[serde(rename = "Id_card_number")]
    pub id_card_number: String,
    #[serde(rename = "Ongoing_treatment")]
    pub ongoing_treatment: String,
    #[serde(rename = "Unhealthy_habits")]
    pub unhealthy_habits: String,
}

/// The latest appointment. All fields are empty when there is none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Topic")]
    pub topic: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalHistory {
    #[serde(rename = "Details")]
    pub details: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Time")]
    pub time: String,
}

/// A linked chronic disease, carrying the joined disease name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChronicDiseaseName {
    #[serde(rename = "DiseaseID")]
    pub disease_name: String,
}

/// A linked drug allergy, carrying the joined drug name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugAllergyName {
    #[serde(rename = "DrugID")]
    pub drug_name: String,
}

/// A patient with every dependent sub-record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(rename = "PatientGeneralInfo")]
    pub general_info: PatientGeneralInfo,
    #[serde(rename = "PatientAppointment")]
    pub appointment: Appointment,
    #[serde(rename = "PatientMedicalHistory")]
    pub medical_history: Vec<MedicalHistory>,
    #[serde(rename = "PatientChronicDisease")]
    pub chronic_diseases: Vec<ChronicDiseaseName>,
    #[serde(rename = "PatientDrugAllergy")]
    pub drug_allergies: Vec<DrugAllergyName>,
}

/// Submitted patient fields.
///
/// On add every field is written (a missing age writes 0). On update only
/// non-empty text fields are written, and age only when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientInput {
    #[serde(alias = "Patient_id")]
    pub patient_id: String,
    #[serde(alias = "First_name")]
    pub first_name: String,
    #[serde(alias = "Last_name")]
    pub last_name: String,
    #[serde(alias = "Age")]
    pub age: Option<i32>,
    #[serde(alias = "Date_of_birth")]
    pub date_of_birth: String,
    #[serde(alias = "Gender")]
    pub gender: String,
    #[serde(alias = "Blood_type")]
    pub blood_type: String,
    #[serde(alias = "Email")]
    pub email: String,
    #[serde(alias = "Health_insurance")]
    pub health_insurance: String,
    #[serde(alias = "Address")]
    pub address: String,
    #[serde(alias = "Phone_number")]
    pub phone_number: String,
    #[serde(alias = "Id_card_number")]
    pub id_card_number: String,
    #[serde(alias = "Ongoing_treatment")]
    pub ongoing_treatment: String,
    #[serde(alias = "Unhealthy_habits")]
    pub unhealthy_habits: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChronicDiseaseRef {
    #[serde(default, alias = "DiseaseID")]
    pub disease_id: String,
}

impl ChronicDiseaseRef {
    pub fn new(disease_id: impl Into<String>) -> Self {
        Self {
            disease_id: disease_id.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugAllergyRef {
    #[serde(default, alias = "DrugID")]
    pub drug_id: String,
}

impl DrugAllergyRef {
    pub fn new(drug_id: impl Into<String>) -> Self {
        Self {
            drug_id: drug_id.into(),
        }
    }
}

/// Body of a patient add or update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientRequest {
    #[serde(alias = "Patient")]
    pub patient: PatientInput,
    #[serde(default, alias = "PatientChronicDisease")]
    pub chronic_diseases: Vec<ChronicDiseaseRef>,
    #[serde(default, alias = "PatientDrugAllergy")]
    pub drug_allergies: Vec<DrugAllergyRef>,
}

/// Optional search filters; an empty string disables a filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientSearch {
    pub patient_id: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewAppointment {
    #[serde(alias = "Patient_id")]
    pub patient_id: String,
    #[serde(alias = "Date")]
    pub date: String,
    #[serde(alias = "Time")]
    pub time: String,
    #[serde(alias = "Topic")]
    pub topic: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewMedicalHistory {
    #[serde(alias = "Patient_id")]
    pub patient_id: String,
    #[serde(alias = "Detail", alias = "Details")]
    pub detail: String,
    #[serde(alias = "Date")]
    pub date: String,
    #[serde(alias = "Time")]
    pub time: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_serializes_with_historical_keys() {
        let record = PatientRecord {
            general_info: PatientGeneralInfo {
                patient_id: "P1".into(),
                first_name: "Jane".into(),
                ..Default::default()
            },
            chronic_diseases: vec![ChronicDiseaseName {
                disease_name: "Asthma".into(),
            }],
            ..Default::default()
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["PatientGeneralInfo"]["First_name"], "Jane");
        assert_eq!(value["PatientChronicDisease"], json!([{"DiseaseID": "Asthma"}]));
        assert_eq!(
            value["PatientAppointment"],
            json!({"Date": "", "Time": "", "Topic": ""})
        );
        assert_eq!(value["PatientMedicalHistory"], json!([]));
    }

    #[test]
    fn request_accepts_both_key_styles() {
        let snake: PatientRequest = serde_json::from_value(json!({
            "patient": {"patient_id": "P1", "first_name": "Jane", "age": 34},
            "chronic_diseases": [{"disease_id": "D1"}],
        }))
        .unwrap();
        let legacy: PatientRequest = serde_json::from_value(json!({
            "Patient": {"Patient_id": "P1", "First_name": "Jane", "Age": 34},
            "PatientChronicDisease": [{"DiseaseID": "D1"}],
        }))
        .unwrap();

        assert_eq!(snake, legacy);
        assert_eq!(snake.patient.age, Some(34));
        assert!(snake.drug_allergies.is_empty());
    }

    #[test]
    fn omitted_age_is_none() {
        let input: PatientInput = serde_json::from_value(json!({"patient_id": "P1"})).unwrap();
        assert_eq!(input.age, None);
    }
}
