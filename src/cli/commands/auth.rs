use crate::cli::commands::utils::create_authenticator;
use crate::provider::Authenticator;
use crate::state::{credentials, Config};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use tracing::debug;

/// Run the loopback authorization-code flow and store the token.
pub async fn run(config: &Config) -> Result<()> {
    let auth = create_authenticator(config)?;
    let redirect_uri = config.redirect_uri();

    let state = format!("{:016x}", rand::random::<u64>());
    let auth_url = auth.oauth_url(&redirect_uri, &state);

    println!("Opening browser for YouTube authorization...\n");
    println!("If it doesn't open, visit:\n{}\n", auth_url);

    if let Err(err) = open::that(&auth_url) {
        debug!("could not open browser: {}", err);
    }

    let code = wait_for_callback(config.redirect_port, &state)?;

    println!("Exchanging code for token...");
    let token = auth.exchange_code(&code, &redirect_uri).await?;

    credentials::save(&config.data_dir, &token)?;

    println!("\nSuccessfully authenticated with YouTube!");
    println!(
        "  Token saved to {:?}",
        config.credentials_dir().join("youtube.json")
    );

    Ok(())
}

fn wait_for_callback(port: u16, expected_state: &str) -> Result<String> {
    let listener = TcpListener::bind(("127.0.0.1", port))
        .with_context(|| format!("Failed to bind to port {}. Is another instance running?", port))?;

    println!("Waiting for callback...");

    for stream in listener.incoming() {
        let mut stream = stream?;
        let mut reader = BufReader::new(&stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line)?;

        // GET /callback?code=xxx&state=yyy HTTP/1.1
        let Some(query) = request_line
            .split_whitespace()
            .nth(1)
            .and_then(|path| path.strip_prefix("/callback?"))
        else {
            send_response(&mut stream, "404 Not Found", "Not Found")?;
            continue;
        };

        match parse_callback(query, expected_state) {
            Callback::Code(code) => {
                send_response(
                    &mut stream,
                    "200 OK",
                    "<html><body><h1>Success!</h1><p>You can close this tab.</p></body></html>",
                )?;
                return Ok(code);
            }
            Callback::Denied(error) => {
                send_response(&mut stream, "400 Bad Request", &format!("Auth failed: {}", error))?;
                anyhow::bail!("Authorization denied: {}", error);
            }
            Callback::StateMismatch => {
                send_response(&mut stream, "400 Bad Request", "State mismatch - possible CSRF")?;
            }
            Callback::Incomplete => {
                send_response(&mut stream, "400 Bad Request", "Missing code")?;
            }
        }
    }

    anyhow::bail!("No valid callback received")
}

#[derive(Debug, PartialEq, Eq)]
enum Callback {
    Code(String),
    Denied(String),
    StateMismatch,
    Incomplete,
}

fn parse_callback(query: &str, expected_state: &str) -> Callback {
    let params: HashMap<&str, String> = query
        .split('&')
        .filter_map(|p| p.split_once('='))
        .map(|(k, v)| {
            let value = urlencoding::decode(v)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| v.to_string());
            (k, value)
        })
        .collect();

    if params.get("state").map(String::as_str) != Some(expected_state) {
        return Callback::StateMismatch;
    }
    if let Some(error) = params.get("error") {
        return Callback::Denied(error.clone());
    }
    match params.get("code") {
        Some(code) if !code.is_empty() => Callback::Code(code.clone()),
        _ => Callback::Incomplete,
    }
}

fn send_response(stream: &mut impl Write, status: &str, body: &str) -> Result<()> {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes())?;
    stream.flush()?;
    Ok(())
}

pub async fn logout(config: &Config) -> Result<()> {
    if credentials::load(&config.data_dir)?.is_none() {
        println!("Not logged in to YouTube");
        return Ok(());
    }

    credentials::delete(&config.data_dir)?;

    println!("Logged out from YouTube");
    println!("Run 'plsort auth' to login again");

    Ok(())
}

pub async fn whoami(config: &Config) -> Result<()> {
    let token = credentials::load(&config.data_dir)?
        .context("Not authenticated. Run 'plsort auth' first")?;

    println!("Logged in to YouTube");
    println!("Token type: {}", token.token_type);
    if let Some(scope) = &token.scope {
        println!("Scopes: {}", scope);
    }
    if token.refresh_token.is_none() {
        println!("No refresh token: you will have to sign in again once it expires");
    }
    if let Some(expires_at) = token.expires_at {
        let now = credentials::now_secs();
        if now < expires_at {
            println!("Token expires in: {}s", expires_at - now);
        } else {
            println!("Token expired (will auto-refresh on next use)");
        }
    }

    Ok(())
}
