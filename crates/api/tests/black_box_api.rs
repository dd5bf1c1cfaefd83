use estoque_api::config::ApiConfig;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};

const HEADER: &str = "COD,NOME DO PRODUTO,MARCA,CEARÁ,SANTA CATARINA,SÃO PAULO,TOTAL,RESERVA\n";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(ApiConfig {
            database_url: "sqlite::memory:".to_string(),
            ..ApiConfig::default()
        })
        .await
    }

    async fn spawn_with(config: ApiConfig) -> Self {
        // Same router as prod, fresh in-memory store, ephemeral port.
        let app = estoque_api::app::build_app(&config)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn create(&self, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/produtos"))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn search(&self, termo: &str) -> reqwest::Response {
        self.client
            .get(self.url("/produtos/buscar"))
            .query(&[("termo", termo)])
            .send()
            .await
            .unwrap()
    }

    async fn upload(&self, filename: &str, contents: &str) -> reqwest::Response {
        let part = Part::bytes(contents.as_bytes().to_vec()).file_name(filename.to_string());
        self.client
            .post(self.url("/produtos/upload"))
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn error_message(res: reqwest::Response) -> String {
    let body: Value = res.json().await.unwrap();
    body["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_then_search_by_code() {
    let srv = TestServer::spawn().await;

    let res = srv
        .create(json!({ "cod": 1, "nome_do_produto": "Widget", "total": 10 }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(
        created,
        json!({
            "cod": 1,
            "nome_do_produto": "Widget",
            "marca": "",
            "ceara": 0,
            "santa_catarina": 0,
            "sao_paulo": 0,
            "total": 10,
            "reserva": 0,
        })
    );

    let res = srv.search("1").await;
    assert_eq!(res.status(), StatusCode::OK);
    let found: Value = res.json().await.unwrap();
    assert_eq!(found, json!([created]));
}

#[tokio::test]
async fn create_accepts_text_code_from_forms() {
    let srv = TestServer::spawn().await;
    let res = srv.create(json!({ "cod": "15", "ceara": "4" })).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["cod"], 15);
    assert_eq!(created["ceara"], 4);
}

#[tokio::test]
async fn create_accepts_whole_number_float_code() {
    let srv = TestServer::spawn().await;
    let res = srv.create(json!({ "cod": 1.0, "total": "4.0" })).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["cod"], 1);
    assert_eq!(created["total"], 4);

    let res = srv.create(json!({ "cod": "2.0" })).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = srv.create(json!({ "cod": 2.5 })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(res).await, "invalid product code");
}

#[tokio::test]
async fn create_validation_failures() {
    let srv = TestServer::spawn().await;

    let res = srv.create(json!({ "nome_do_produto": "Widget" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(res).await, "product code required");

    let res = srv.create(json!({ "cod": "abc" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(res).await, "invalid product code");

    let res = srv
        .client
        .post(srv.url("/produtos"))
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_create_keeps_existing_row() {
    let srv = TestServer::spawn().await;

    let res = srv.create(json!({ "cod": 3, "nome_do_produto": "First" })).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = srv.create(json!({ "cod": 3, "nome_do_produto": "Second" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(res).await, "product with this code already exists");

    let found: Value = srv.search("3").await.json().await.unwrap();
    assert_eq!(found[0]["nome_do_produto"], "First");
}

#[tokio::test]
async fn search_by_name_is_case_insensitive_substring() {
    let srv = TestServer::spawn().await;
    for (cod, name) in [(1, "Parafuso Sextavado"), (2, "Porca"), (3, "parafuso fenda")] {
        srv.create(json!({ "cod": cod, "nome_do_produto": name })).await;
    }

    let found: Value = srv.search("PARAFUSO").await.json().await.unwrap();
    let codes: Vec<i64> = found
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["cod"].as_i64().unwrap())
        .collect();
    assert_eq!(codes, vec![1, 3]);

    let found: Value = srv.search("999").await.json().await.unwrap();
    assert_eq!(found, json!([]));
}

#[tokio::test]
async fn search_requires_a_term() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/produtos/buscar")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(res).await, "search term required");

    let res = srv.search("").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_changes_only_supplied_fields() {
    let srv = TestServer::spawn().await;
    srv.create(json!({ "cod": 1, "nome_do_produto": "Widget", "total": 10 }))
        .await;

    let res = srv
        .client
        .put(srv.url("/produtos/1"))
        .json(&json!({ "marca": "Acme", "cod": 99, "total": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["cod"], 1);
    assert_eq!(updated["marca"], "Acme");
    assert_eq!(updated["nome_do_produto"], "Widget");
    assert_eq!(updated["total"], 10);

    let found: Value = srv.search("1").await.json().await.unwrap();
    assert_eq!(found[0], updated);
}

#[tokio::test]
async fn update_unknown_product_is_not_found() {
    let srv = TestServer::spawn().await;

    for path in ["/produtos/42", "/produtos/abc"] {
        let res = srv
            .client
            .put(srv.url(path))
            .json(&json!({ "marca": "Acme" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{path}");
        assert_eq!(error_message(res).await, "product not found");
    }
}

#[tokio::test]
async fn update_rejects_non_object_body() {
    let srv = TestServer::spawn().await;
    srv.create(json!({ "cod": 1 })).await;

    let res = srv
        .client
        .put(srv.url("/produtos/1"))
        .json(&json!(["marca"]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(res).await, "invalid request body");
}

#[tokio::test]
async fn list_paginates_in_code_order() {
    let srv = TestServer::spawn().await;
    for cod in [5, 3, 1, 4, 2] {
        srv.create(json!({ "cod": cod })).await;
    }

    let page: Value = srv
        .client
        .get(srv.url("/produtos?page=2&per_page=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 5);
    assert_eq!(page["pages"], 3);
    assert_eq!(page["current_page"], 2);
    let codes: Vec<i64> = page["produtos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["cod"].as_i64().unwrap())
        .collect();
    assert_eq!(codes, vec![3, 4]);

    let past_end: Value = srv
        .client
        .get(srv.url("/produtos?page=10&per_page=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(past_end["produtos"], json!([]));
    assert_eq!(past_end["current_page"], 10);

    let lenient: Value = srv
        .client
        .get(srv.url("/produtos?page=abc"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(lenient["current_page"], 1);
    assert_eq!(lenient["pages"], 1);
    assert_eq!(lenient["produtos"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn list_caps_page_size() {
    let srv = TestServer::spawn().await;
    let mut sheet = HEADER.to_string();
    for cod in 1..=101 {
        sheet.push_str(&format!("{cod},Item {cod},Marca,0,0,0,0,0\n"));
    }
    let res = srv.upload("estoque.csv", &sheet).await;
    assert_eq!(res.status(), StatusCode::OK);

    let page: Value = srv
        .client
        .get(srv.url("/produtos?per_page=1000000"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 101);
    assert_eq!(page["pages"], 2);
    assert_eq!(page["produtos"].as_array().unwrap().len(), 100);
}

#[tokio::test]
async fn list_of_empty_store() {
    let srv = TestServer::spawn().await;
    let page: Value = srv
        .client
        .get(srv.url("/produtos"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page, json!({ "produtos": [], "total": 0, "pages": 0, "current_page": 1 }));
}

#[tokio::test]
async fn upload_inserts_then_updates() {
    let srv = TestServer::spawn().await;
    let sheet = format!(
        "{HEADER}1,Parafuso,Acme,#REF!,5,7,15,2\n2,Porca,,3.7,,,3,\n,Sem codigo,X,1,1,1,1,1\nabc,Ruim,X,1,1,1,1,1\n"
    );

    let res = srv.upload("estoque.csv", &sheet).await;
    assert_eq!(res.status(), StatusCode::OK);
    let summary: Value = res.json().await.unwrap();
    assert_eq!(summary["produtos_inseridos"], 2);
    assert_eq!(summary["produtos_atualizados"], 0);
    let ignored = summary["linhas_ignoradas"].as_array().unwrap();
    assert_eq!(ignored.len(), 1);
    assert_eq!(ignored[0]["cod"], "abc");
    assert_eq!(ignored[0]["linha"], 5);

    let found: Value = srv.search("1").await.json().await.unwrap();
    assert_eq!(found[0]["ceara"], 0);
    assert_eq!(found[0]["sao_paulo"], 7);
    let found: Value = srv.search("2").await.json().await.unwrap();
    assert_eq!(found[0]["ceara"], 3);
    assert_eq!(found[0]["marca"], "");

    let page: Value = srv
        .client
        .get(srv.url("/produtos"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 2);

    let res = srv.upload("estoque.csv", &format!("{HEADER}1,Parafuso Novo,Acme,0,0,0,0,0\n")).await;
    let summary: Value = res.json().await.unwrap();
    assert_eq!(summary["produtos_inseridos"], 0);
    assert_eq!(summary["produtos_atualizados"], 1);
    let found: Value = srv.search("1").await.json().await.unwrap();
    assert_eq!(found[0]["nome_do_produto"], "Parafuso Novo");
    assert_eq!(found[0]["total"], 0);
}

#[tokio::test]
async fn upload_rejects_bad_requests() {
    let srv = TestServer::spawn().await;

    let res = srv.upload("estoque.xlsx", HEADER).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(res).await, "only CSV files accepted");

    let res = srv.upload("ESTOQUE.CSV", HEADER).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .post(srv.url("/produtos/upload"))
        .multipart(Form::new().text("other", "value"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(res).await, "no file uploaded");
}

#[tokio::test]
async fn upload_without_code_column_fails_and_commits_nothing() {
    let srv = TestServer::spawn().await;

    let res = srv.upload("estoque.csv", "NOME DO PRODUTO,TOTAL\nParafuso,3\n").await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let message = error_message(res).await;
    assert!(message.starts_with("failed to process spreadsheet"), "{message}");

    let page: Value = srv
        .client
        .get(srv.url("/produtos"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn upload_over_the_body_limit_is_refused() {
    let srv = TestServer::spawn_with(ApiConfig {
        database_url: "sqlite::memory:".to_string(),
        max_upload_bytes: 256,
        ..ApiConfig::default()
    })
    .await;

    let mut sheet = HEADER.to_string();
    for cod in 0..100 {
        sheet.push_str(&format!("{cod},Item {cod},Marca,1,1,1,3,0\n"));
    }
    let res = srv.upload("estoque.csv", &sheet).await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn routes_answer_under_api_prefix() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/api/produtos"))
        .json(&json!({ "cod": 8, "nome_do_produto": "Arruela" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let found: Value = srv
        .client
        .get(srv.url("/api/produtos/buscar?termo=arruela"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(found[0]["cod"], 8);

    let page: Value = srv
        .client
        .get(srv.url("/api/produtos"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 1);
}
