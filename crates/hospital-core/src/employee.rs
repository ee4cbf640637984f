//! Employee directory workflow.

use hospital_storage::{DynRecordStore, Filter, Insert, Join, Row, Select, SqlValue, StorageResult, Update};
use tracing::{info, instrument, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::mapping::{DecodeWarning, RowReader, parse_date, require, resignation_text};
use crate::models::{EmployeeChanges, EmployeeRecord, NewEmployee};

const EMPLOYEE: &str = "Employee";

const EMPLOYEE_COLUMNS: [&str; 11] = [
    "Employee.employee_id",
    "Employee.first_name",
    "Employee.last_name",
    "Position.position_name",
    "Employee.phone_number",
    "Department.department_name",
    "Employee.salary",
    "Employee.email",
    "Employee.hire_date",
    "Employee.resignation_date",
    "Employee.work_status",
];

/// Reads and writes employees joined with their position and department.
#[derive(Clone)]
pub struct EmployeeService {
    store: DynRecordStore,
}

impl EmployeeService {
    #[must_use]
    pub fn new(store: DynRecordStore) -> Self {
        Self { store }
    }

    /// Searches by exact id and case-insensitive name substrings, newest id
    /// first. Blank filters match everything; no match is an empty list.
    #[instrument(skip(self))]
    pub async fn search_employees(
        &self,
        employee_id: &str,
        first_name: &str,
        last_name: &str,
    ) -> ServiceResult<Vec<EmployeeRecord>> {
        let query = base_select()
            .filter(Filter::optional_eq("Employee.employee_id", employee_id.trim()))
            .filter(Filter::optional_contains("Employee.first_name", first_name.trim()))
            .filter(Filter::optional_contains("Employee.last_name", last_name.trim()))
            .order_by_desc("Employee.employee_id");

        self.fetch(&query).await
    }

    /// # Errors
    ///
    /// `NotFound` when no employee has this id.
    #[instrument(skip(self))]
    pub async fn get_employee(&self, employee_id: &str) -> ServiceResult<EmployeeRecord> {
        let query = base_select().filter(Filter::eq("Employee.employee_id", employee_id.trim()));
        self.fetch(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found("Employee"))
    }

    /// Every employee, newest id first.
    #[instrument(skip(self))]
    pub async fn list_employees(&self) -> ServiceResult<Vec<EmployeeRecord>> {
        self.fetch(&base_select().order_by_desc("Employee.employee_id"))
            .await
    }

    /// # Errors
    ///
    /// `Validation` for blank ids or malformed dates.
    #[instrument(skip(self, employee), fields(employee_id = %employee.employee_id))]
    pub async fn add_employee(&self, employee: &NewEmployee) -> ServiceResult<u64> {
        require("employee_id", &employee.employee_id)?;
        require("position_id", &employee.position_id)?;

        let mut insert = Insert::into(EMPLOYEE)
            .value("employee_id", employee.employee_id.trim())
            .value("first_name", employee.first_name.as_str())
            .value("last_name", employee.last_name.as_str())
            .value("position_id", employee.position_id.trim())
            .value("phone_number", employee.phone_number.as_str())
            .value("salary", salary_value(employee.salary))
            .value("email", employee.email.as_str())
            .value("hire_date", parse_date("hire_date", &employee.hire_date)?);

        insert = match employee.resignation_date.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => {
                insert.value("resignation_date", parse_date("resignation_date", date)?)
            }
            _ => insert.value("resignation_date", SqlValue::Null),
        };
        if !employee.work_status.trim().is_empty() {
            insert = insert.value("work_status", employee.work_status.trim());
        }

        let affected = self.store.insert(&insert).await?;
        info!("employee added");
        Ok(affected)
    }

    /// Applies the non-blank fields of `changes`.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank id, an empty change set or malformed dates.
    #[instrument(skip(self, changes))]
    pub async fn update_employee(
        &self,
        employee_id: &str,
        changes: &EmployeeChanges,
    ) -> ServiceResult<u64> {
        require("employee_id", employee_id)?;

        let mut update = Update::table(EMPLOYEE).filter(Filter::eq("employee_id", employee_id.trim()));
        let text_fields = [
            ("first_name", &changes.first_name),
            ("last_name", &changes.last_name),
            ("position_id", &changes.position_id),
            ("phone_number", &changes.phone_number),
            ("email", &changes.email),
            ("work_status", &changes.work_status),
        ];
        for (column, value) in text_fields {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                update = update.set(column, value);
            }
        }
        if let Some(salary) = changes.salary {
            update = update.set("salary", salary_value(salary));
        }
        if let Some(date) = changes.hire_date.as_deref().filter(|d| !d.trim().is_empty()) {
            update = update.set("hire_date", parse_date("hire_date", date)?);
        }
        if let Some(date) = changes.resignation_date.as_deref().filter(|d| !d.trim().is_empty()) {
            update = update.set("resignation_date", parse_date("resignation_date", date)?);
        }

        if update.is_empty() {
            return Err(ServiceError::validation("no fields to update"));
        }

        let affected = self.store.update(&update).await?;
        info!(affected, "employee updated");
        Ok(affected)
    }

    async fn fetch(&self, query: &Select) -> ServiceResult<Vec<EmployeeRecord>> {
        let rows = self.store.select(query).await?;
        let mut employees = Vec::with_capacity(rows.len());
        for row in &rows {
            let (employee, warnings) = map_employee(row)?;
            if !warnings.is_empty() {
                warn!(
                    employee_id = %employee.employee_id,
                    warnings = warnings.len(),
                    "employee decoded with defaults"
                );
            }
            employees.push(employee);
        }
        Ok(employees)
    }
}

fn base_select() -> Select {
    Select::from(EMPLOYEE)
        .columns(EMPLOYEE_COLUMNS)
        .join(Join::new("Position", "Employee.position_id", "Position.position_id"))
        .join(Join::new("Department", "Position.department_id", "Department.department_id"))
}

fn salary_value(salary: f64) -> SqlValue {
    SqlValue::Decimal(format!("{salary:.2}"))
}

/// Maps one joined employee row.
///
/// An unparsable salary becomes `0` and is reported in the returned
/// warnings. A missing or zero resignation date renders as
/// [`NOT_RESIGNED`](crate::mapping::NOT_RESIGNED).
///
/// # Errors
///
/// `Decode` when `hire_date` is not a date.
pub fn map_employee(row: &Row) -> StorageResult<(EmployeeRecord, Vec<DecodeWarning>)> {
    let mut r = RowReader::new(row);
    let salary = r.decimal("salary");

    let employee = EmployeeRecord {
        employee_id: r.text("employee_id"),
        first_name: r.text("first_name"),
        last_name: r.text("last_name"),
        position_name: r.text("position_name"),
        phone_number: r.text("phone_number"),
        department_name: r.text("department_name"),
        salary,
        email: r.text("email"),
        hire_date: r.date("hire_date")?,
        resignation_date: resignation_text(r.optional_date("resignation_date")?),
        work_status: r.text("work_status"),
    };
    Ok((employee, r.into_warnings()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::NOT_RESIGNED;
    use chrono::NaiveDate;

    fn joined_row(salary: SqlValue, resigned: SqlValue) -> Row {
        Row::new()
            .with("employee_id", "E1")
            .with("first_name", "Ann")
            .with("last_name", "Lee")
            .with("position_name", "Nurse")
            .with("department_name", "Cardiology")
            .with("salary", salary)
            .with("hire_date", NaiveDate::from_ymd_opt(2020, 1, 15).unwrap())
            .with("resignation_date", resigned)
            .with("work_status", "active")
    }

    #[test]
    fn maps_joined_columns() {
        let row = joined_row(SqlValue::Decimal("52000.00".into()), SqlValue::Null);
        let (employee, warnings) = map_employee(&row).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(employee.position_name, "Nurse");
        assert_eq!(employee.department_name, "Cardiology");
        assert_eq!(employee.salary, 52000.0);
        assert_eq!(employee.hire_date, "2020-01-15");
        assert_eq!(employee.resignation_date, NOT_RESIGNED);
    }

    #[test]
    fn bad_salary_is_zero_with_warning() {
        let resigned = SqlValue::Date(NaiveDate::from_ymd_opt(2023, 6, 30).unwrap());
        let row = joined_row(SqlValue::Text("lots".into()), resigned);
        let (employee, warnings) = map_employee(&row).unwrap();

        assert_eq!(employee.salary, 0.0);
        assert_eq!(employee.resignation_date, "2023-06-30");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].column, "salary");
    }

    #[test]
    fn textual_hire_date_fails() {
        let row = joined_row(SqlValue::Decimal("1".into()), SqlValue::Null).with("hire_date", "soon");
        assert!(map_employee(&row).unwrap_err().is_decode());
    }

    #[test]
    fn salary_is_stored_with_two_decimals() {
        assert_eq!(salary_value(1250.5), SqlValue::Decimal("1250.50".into()));
    }
}
