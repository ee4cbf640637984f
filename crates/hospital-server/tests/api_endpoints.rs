use std::sync::Arc;

use hospital_auth::AuthConfig;
use hospital_db_memory::InMemoryStore;
use hospital_server::{AppConfig, AppState, StorageBackend, build_app};
use hospital_storage::Row;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

struct TestServer {
    base: String,
    shutdown: tokio::sync::oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}

async fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::with_hospital_schema();
    store
        .seed(
            "disease",
            [Row::new().with("disease_id", "D1").with("disease_name", "D1")],
        )
        .await;
    store
        .seed(
            "drug",
            [Row::new().with("drug_id", "R1").with("drug_name", "Penicillin")],
        )
        .await;
    store
        .seed(
            "Department",
            [Row::new().with("department_id", "DEP1").with("department_name", "Cardiology")],
        )
        .await;
    store
        .seed(
            "Position",
            [Row::new()
                .with("position_id", "POS1")
                .with("position_name", "Nurse")
                .with("department_id", "DEP1")],
        )
        .await;
    store
}

async fn start_server() -> TestServer {
    let mut cfg = AppConfig::default();
    cfg.storage.backend = StorageBackend::Memory;
    cfg.auth = AuthConfig::new("test-secret-0123456789abcdefghijklmnop");

    let store = seeded_store().await;
    let state = AppState::new(Arc::new(store), &cfg).expect("app state");
    let app = build_app(state, &cfg);

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        base: format!("http://{addr}"),
        shutdown: tx,
        handle,
    }
}

async fn token_for(client: &Client, base: &str, username: &str, role: &str, id: &str) -> String {
    let resp = client
        .post(format!("{base}/register"))
        .json(&json!({ "username": username, "password": "s3cret!", "role": role, "id": id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(format!("{base}/login"))
        .json(&json!({ "username": username, "password": "s3cret!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["token_type"], "Bearer");
    body["token"].as_str().unwrap().to_string()
}

fn patient_body(id: &str) -> Value {
    json!({
        "Patient": {
            "Patient_id": id,
            "First_name": "Jane",
            "Last_name": "Doe",
            "Age": 34,
            "Date_of_birth": "1990-05-01",
            "Gender": "F",
            "Blood_type": "O+",
            "Email": "jane@example.com",
            "Health_insurance": "Y",
            "Address": "1 Main St",
            "Phone_number": "555-0100",
            "Id_card_number": "ID-1",
            "Ongoing_treatment": "none",
            "Unhealthy_habits": "none"
        },
        "PatientChronicDisease": [{ "DiseaseID": "D1" }],
        "PatientDrugAllergy": [{ "DrugID": "R1" }]
    })
}

#[tokio::test]
async fn healthz_is_public_and_echoes_request_id() {
    let server = start_server().await;
    let client = Client::new();

    let resp = client
        .get(format!("{}/healthz", server.base))
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-request-id"], "req-42");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "memory");

    server.stop().await;
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let server = start_server().await;
    let client = Client::new();

    let resp = client.get(format!("{}/patients", server.base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    let resp = client
        .get(format!("{}/patients", server.base))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    server.stop().await;
}

#[tokio::test]
async fn login_rejects_wrong_password_and_duplicate_register_conflicts() {
    let server = start_server().await;
    let client = Client::new();
    let base = &server.base;

    token_for(&client, base, "doc", "doctor", "E1").await;

    let resp = client
        .post(format!("{base}/login"))
        .json(&json!({ "username": "doc", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .post(format!("{base}/register"))
        .json(&json!({ "username": "doc", "password": "x", "role": "doctor", "id": "E2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    server.stop().await;
}

#[tokio::test]
async fn non_json_bodies_are_unsupported() {
    let server = start_server().await;
    let client = Client::new();

    let resp = client
        .post(format!("{}/register", server.base))
        .header("content-type", "text/plain")
        .body("username=doc")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    server.stop().await;
}

#[tokio::test]
async fn patient_workflow_over_http() {
    let server = start_server().await;
    let client = Client::new();
    let base = &server.base;
    let token = token_for(&client, base, "doc", "doctor", "E1").await;

    let resp = client
        .post(format!("{base}/patients"))
        .bearer_auth(&token)
        .json(&patient_body("P1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(format!("{base}/patients/appointments"))
        .bearer_auth(&token)
        .json(&json!({ "Patient_id": "P1", "Date": "2024-03-01", "Time": "09:30:00", "Topic": "Checkup" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .get(format!("{base}/patients/P1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["PatientGeneralInfo"]["First_name"], "Jane");
    assert_eq!(body["PatientGeneralInfo"]["Date_of_birth"], "1990-05-01");
    assert_eq!(body["PatientChronicDisease"], json!([{ "DiseaseID": "D1" }]));
    assert_eq!(body["PatientDrugAllergy"], json!([{ "DrugID": "Penicillin" }]));
    assert_eq!(body["PatientAppointment"]["Topic"], "Checkup");

    let resp = client
        .get(format!("{base}/patients/search?first_name=jan"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let found: Value = resp.json().await.unwrap();
    assert_eq!(found.as_array().unwrap().len(), 1);

    let mut update = patient_body("P1");
    update["Patient"]["First_name"] = json!("Janet");
    update["PatientDrugAllergy"] = json!([]);
    let resp = client
        .put(format!("{base}/patients"))
        .bearer_auth(&token)
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    // One Patient row plus the re-inserted disease link
    assert_eq!(body["rows_affected"], 2);

    let body: Value = client
        .get(format!("{base}/patients/P1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["PatientGeneralInfo"]["First_name"], "Janet");
    assert_eq!(body["PatientDrugAllergy"], json!([]));

    server.stop().await;
}

#[tokio::test]
async fn missing_and_invalid_patients_map_to_client_errors() {
    let server = start_server().await;
    let client = Client::new();
    let base = &server.base;
    let token = token_for(&client, base, "doc", "doctor", "E1").await;

    let resp = client
        .get(format!("{base}/patients/NOPE"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Patient not found");

    let resp = client
        .put(format!("{base}/patients"))
        .bearer_auth(&token)
        .json(&json!({ "Patient": { "First_name": "Nobody" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .post(format!("{base}/patients"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    server.stop().await;
}

#[tokio::test]
async fn patients_are_confined_to_their_own_record() {
    let server = start_server().await;
    let client = Client::new();
    let base = &server.base;

    let staff = token_for(&client, base, "doc", "doctor", "E1").await;
    let resp = client
        .post(format!("{base}/patients"))
        .bearer_auth(&staff)
        .json(&patient_body("P7"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let patient = token_for(&client, base, "jane", "patient", "P7").await;

    let resp = client
        .get(format!("{base}/patients"))
        .bearer_auth(&patient)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = client
        .get(format!("{base}/profile"))
        .bearer_auth(&patient)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["username"], "jane");
    assert_eq!(body["role"], "patient");
    assert_eq!(body["patient_id"], "P7");

    let resp = client
        .get(format!("{base}/patients/me"))
        .bearer_auth(&patient)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["PatientGeneralInfo"]["Patient_id"], "P7");

    server.stop().await;
}

#[tokio::test]
async fn employee_directory_over_http() {
    let server = start_server().await;
    let client = Client::new();
    let base = &server.base;
    let token = token_for(&client, base, "admin", "admin", "E0").await;

    let resp = client
        .post(format!("{base}/employees"))
        .bearer_auth(&token)
        .json(&json!({
            "Employee_id": "E1",
            "First_name": "Ann",
            "Last_name": "Lee",
            "Position_id": "POS1",
            "Phone_number": "555-0111",
            "Salary": 52000.0,
            "Email": "ann@example.com",
            "Hire_date": "2020-01-15"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["rows_affected"], 1);

    let resp = client
        .get(format!("{base}/employees/E1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["Position_name"], "Nurse");
    assert_eq!(body["Department_name"], "Cardiology");
    assert_eq!(body["Resignation_date"], "Not resigned yet");

    let resp = client
        .put(format!("{base}/employees/E1"))
        .bearer_auth(&token)
        .json(&json!({ "Work_status": "on leave" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base}/employees/search?last_name=le"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let found: Value = resp.json().await.unwrap();
    assert_eq!(found[0]["Work_status"], "on leave");

    let resp = client
        .get(format!("{base}/employees/search?last_name=zzz"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!([]));

    let resp = client
        .get(format!("{base}/employees/E404"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}
