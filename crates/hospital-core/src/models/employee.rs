use serde::{Deserialize, Serialize};

/// One employee joined with position and department names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    #[serde(rename = "Employee_id")]
    pub employee_id: String,
    #[serde(rename = "First_name")]
    pub first_name: String,
    #[serde(rename = "Last_name")]
    pub last_name: String,
    #[serde(rename = "Position_name")]
    pub position_name: String,
    #[serde(rename = "Phone_number")]
    pub phone_number: String,
    #[serde(rename = "Department_name")]
    pub department_name: String,
    #[serde(rename = "Salary")]
    pub salary: f64,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Hire_date")]
    pub hire_date: String,
    /// `YYYY-MM-DD`, or `"Not resigned yet"`.
    #[serde(rename = "Resignation_date")]
    pub resignation_date: String,
    #[serde(rename = "Work_status")]
    pub work_status: String,
}

/// A new employee row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewEmployee {
    #[serde(alias = "Employee_id")]
    pub employee_id: String,
    #[serde(alias = "First_name")]
    pub first_name: String,
    #[serde(alias = "Last_name")]
    pub last_name: String,
    #[serde(alias = "Position_id")]
    pub position_id: String,
    #[serde(alias = "Phone_number")]
    pub phone_number: String,
    #[serde(alias = "Salary")]
    pub salary: f64,
    #[serde(alias = "Email")]
    pub email: String,
    #[serde(alias = "Hire_date")]
    pub hire_date: String,
    /// Blank or absent means not resigned.
    #[serde(alias = "Resignation_date")]
    pub resignation_date: Option<String>,
    /// Blank leaves the column default.
    #[serde(alias = "Work_status")]
    pub work_status: String,
}

/// A partial employee update. Absent and blank fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeChanges {
    #[serde(alias = "First_name")]
    pub first_name: Option<String>,
    #[serde(alias = "Last_name")]
    pub last_name: Option<String>,
    #[serde(alias = "Position_id")]
    pub position_id: Option<String>,
    #[serde(alias = "Phone_number")]
    pub phone_number: Option<String>,
    #[serde(alias = "Salary")]
    pub salary: Option<f64>,
    #[serde(alias = "Email")]
    pub email: Option<String>,
    #[serde(alias = "Hire_date")]
    pub hire_date: Option<String>,
    #[serde(alias = "Resignation_date")]
    pub resignation_date: Option<String>,
    #[serde(alias = "Work_status")]
    pub work_status: Option<String>,
}
