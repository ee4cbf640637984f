//! Request and response shapes.
//!
//! Response field names keep the historical JSON keys
//! (`PatientGeneralInfo`, `First_name`, ...). Request fields are snake_case
//! and also accept the historical keys.

mod employee;
mod patient;

pub use employee::{EmployeeChanges, EmployeeRecord, NewEmployee};
pub use patient::{
    Appointment, ChronicDiseaseName, ChronicDiseaseRef, DrugAllergyName, DrugAllergyRef,
    MedicalHistory, NewAppointment, NewMedicalHistory, PatientGeneralInfo, PatientInput,
    PatientRecord, PatientRequest, PatientSearch,
};
