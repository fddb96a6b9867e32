use clap::Parser;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "trigger-cli")]
#[command(about = "Call a reboot-trigger endpoint", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "https://localhost:51822")]
    url: String,

    #[arg(short, long, default_value = "/sys/hook/trigger-57829c4/")]
    path: String,

    #[arg(short, long, env = "TOKEN")]
    token: String,

    /// Accept self-signed or otherwise untrusted certificates.
    #[arg(long)]
    insecure: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(cli.insecure)
        .build()?;

    let mut headers = HeaderMap::new();
    headers.insert("x-api-key", HeaderValue::from_str(&cli.token)?);

    let url = format!("{}{}", cli.url.trim_end_matches('/'), cli.path);
    let res = match client.get(&url).headers(headers).send().await {
        Ok(res) => res,
        Err(e) if e.is_connect() => return Err(e.into()),
        Err(e) => {
            eprintln!("Connection closed without a response (bad token, rate limited or wrong path): {}", e);
            std::process::exit(2);
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let json: Value = res.json().await?;
    if !status.is_success() {
        eprintln!("Error: trigger returned status {}", status);
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
