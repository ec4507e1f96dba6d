use clap::{Parser, Subcommand, ValueEnum};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, RETRY_AFTER, SET_COOKIE};
use serde_json::{json, Value};

use admission_gate::auth::{ADMIN_AUTH_PREFIX, PREVIEW_AUTH_PREFIX};

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Management CLI for the admission gate", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Raw Cookie header to send, e.g. `preview_auth=authenticated`.
    #[arg(short, long)]
    cookie: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Gate {
    Preview,
    Admin,
}

impl Gate {
    fn prefix(self) -> &'static str {
        match self {
            Gate::Preview => PREVIEW_AUTH_PREFIX,
            Gate::Admin => ADMIN_AUTH_PREFIX,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print the session cookie
    Login {
        #[arg(short, long, value_enum, default_value = "preview")]
        gate: Gate,
        #[arg(short, long)]
        password: String,
    },
    /// Clear the session cookie
    Logout {
        #[arg(short, long, value_enum, default_value = "preview")]
        gate: Gate,
    },
    /// Check whether the cookie holds a valid session
    Status {
        #[arg(short, long, value_enum, default_value = "preview")]
        gate: Gate,
    },
    /// Send repeated requests and show rate limit headers
    Probe {
        path: String,
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
        #[arg(short, long)]
        origin: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    let mut headers = HeaderMap::new();
    if let Some(cookie) = &cli.cookie {
        headers.insert(COOKIE, HeaderValue::from_str(cookie)?);
    }

    match cli.command {
        Commands::Login { gate, password } => {
            let res = client
                .post(format!("{}{}/login", cli.url, gate.prefix()))
                .json(&json!({ "password": password }))
                .send()
                .await?;
            print_cookie(&res);
            print_response(res).await?;
        }
        Commands::Logout { gate } => {
            let res = client
                .post(format!("{}{}/logout", cli.url, gate.prefix()))
                .headers(headers)
                .send()
                .await?;
            print_cookie(&res);
            print_response(res).await?;
        }
        Commands::Status { gate } => {
            let res = client
                .get(format!("{}{}/status", cli.url, gate.prefix()))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Probe {
            path,
            count,
            origin,
        } => {
            if let Some(origin) = &origin {
                headers.insert("origin", HeaderValue::from_str(origin)?);
            }
            for i in 1..=count {
                let res = client
                    .get(format!("{}{}", cli.url, path))
                    .headers(headers.clone())
                    .send()
                    .await?;
                println!(
                    "#{:<4} {}  limit={} remaining={} retry-after={}",
                    i,
                    res.status(),
                    header_str(&res, "x-ratelimit-limit"),
                    header_str(&res, "x-ratelimit-remaining"),
                    header_str(&res, RETRY_AFTER.as_str()),
                );
            }
        }
    }

    Ok(())
}

fn header_str<'a>(res: &'a reqwest::Response, name: &str) -> &'a str {
    res.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

fn print_cookie(res: &reqwest::Response) {
    for value in res.headers().get_all(SET_COOKIE) {
        if let Ok(cookie) = value.to_str() {
            println!("Set-Cookie: {}", cookie);
        }
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gate returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
