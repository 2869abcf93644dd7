// src/main.rs

use reqwest::{redirect::Policy, Client, StatusCode};
use serde::Deserialize;
use std::error::Error;

// Response types
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let base_url =
        std::env::var("BUSCATIVA_URL").unwrap_or_else(|_| "http://localhost:5000".to_string());
    // Redirects are inspected by hand so every step can be checked.
    let client = Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()?;

    // Test 1: Health check
    println!("\n🔍 Testing health check endpoint...");
    let health_response = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .json::<HealthResponse>()
        .await?;
    println!("Health check response: {:?}", health_response);
    if health_response.status != "ok" {
        return Err(format!("Unexpected health status: {}", health_response.status).into());
    }

    // Test 2: Protected route without a session
    println!("\n🔍 Testing that /registro requires login...");
    let anonymous = client.get(format!("{}/registro", base_url)).send().await?;
    println!(
        "Anonymous /registro status: {} -> {:?}",
        anonymous.status(),
        anonymous.headers().get("location")
    );

    // Test 3: Rejected login
    println!("\n🔍 Testing login with a wrong password...");
    let rejected = client
        .post(format!("{}/login", base_url))
        .form(&[("usuario", "nao-existe"), ("senha", "errada")])
        .send()
        .await?;
    println!(
        "Rejected login status: {} -> {:?}",
        rejected.status(),
        rejected.headers().get("location")
    );

    let username = prompt_for("Monitor username (press Enter to stop here):")?;
    if username.is_empty() {
        println!("\n✅ Anonymous checks complete!");
        return Ok(());
    }
    let password = prompt_for("Monitor password:")?;

    // Test 4: Login
    println!("\n🔍 Logging in as {}...", username);
    let login = client
        .post(format!("{}/login", base_url))
        .form(&[("usuario", username.as_str()), ("senha", password.as_str())])
        .send()
        .await?;
    let landed_on = location_of(&login);
    println!("Login status: {} -> {}", login.status(), landed_on);
    if landed_on != "/registro" {
        return Err("Login was rejected".into());
    }

    // Test 5: Record an absence
    println!("\n🔍 Submitting a test absence...");
    let submission = client
        .post(format!("{}/registro", base_url))
        .form(&[
            ("aluno_nome", "Aluno Teste"),
            ("data_falta", "2024-05-10"),
            ("motivo", "Teste automatizado"),
        ])
        .send()
        .await?;
    println!(
        "Submission status: {} -> {}",
        submission.status(),
        location_of(&submission)
    );
    let page = client.get(format!("{}/registro", base_url)).send().await?;
    println!("Registro page after submission:\n{}", page.text().await?);

    // Test 6: Download the monthly ledger
    println!("\n🔍 Downloading the current ledger...");
    let download = client.get(format!("{}/baixar", base_url)).send().await?;
    if download.status() == StatusCode::OK {
        let disposition = download
            .headers()
            .get("content-disposition")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = download.text().await?;
        println!("Downloaded ledger ({}):", disposition);
        println!("  {} line(s)", body.lines().count());
        if let Some(last) = body.lines().last() {
            println!("  Last row: {}", last);
        }
    } else {
        println!("Download failed with status: {}", download.status());
    }

    // Test 7: Status page
    println!("\n🔍 Fetching /status...");
    let status = client.get(format!("{}/status", base_url)).send().await?;
    println!("Status page: {}", status.text().await?);

    // Test 8: Logout
    let logout = client.get(format!("{}/logout", base_url)).send().await?;
    println!("\nLogout status: {} -> {}", logout.status(), location_of(&logout));

    println!("\n✅ Testing complete!");

    Ok(())
}

fn location_of(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn prompt_for(label: &str) -> Result<String, Box<dyn Error>> {
    println!("{}", label);
    let mut value = String::new();
    std::io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}
