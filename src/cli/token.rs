//! Token subcommands: `regenerate` and `inspect`

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use serde_json::{Value, json};

use crate::token::{Token, TokenGenerator, TokenRegenerator};

/// Arguments for `regenerate`
#[derive(Debug, Args)]
pub struct RegenerateArgs {
    /// Existing token carrying s1/s2/s3 in its payload
    #[arg(short, long, value_name = "TOKEN")]
    pub token: String,

    /// Request URL the new token will sign (its query string is hashed)
    #[arg(short, long, value_name = "URL")]
    pub url: String,

    /// Request body to hash into `hb`
    #[arg(short, long, value_name = "BODY", default_value = "")]
    pub body: String,

    /// Leave s1/s2/s3 out of the new payload
    #[arg(long)]
    pub no_embed: bool,
}

/// Arguments for `inspect`
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Token to decode
    #[arg(short, long, value_name = "TOKEN")]
    pub token: String,

    /// Print s3 instead of masking it
    #[arg(long)]
    pub reveal_secret: bool,
}

/// Print a freshly signed token for `args.url`.
pub fn run_regenerate(args: &RegenerateArgs) -> Result<()> {
    let regenerator = TokenRegenerator::new(TokenGenerator::new(!args.no_embed));
    let token = regenerator.regenerate(&args.token, &args.url, &args.body)?;
    println!("{}", token);
    Ok(())
}

/// Print a token's header and payload as JSON.
pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    let token = Token::parse(&args.token)?;
    println!("{}", serde_json::to_string_pretty(&describe(&token, args.reveal_secret)?)?);
    Ok(())
}

fn describe(token: &Token, reveal_secret: bool) -> Result<Value> {
    let header: Value = serde_json::from_slice(&crate::token::crypto::base64_url_decode(
        token.header_segment(),
    )?)?;
    let mut payload = token.payload()?;

    if !reveal_secret {
        if let Some(secret) = payload.get_mut("s3").filter(|v| v.is_string()) {
            *secret = Value::String("***".to_string());
        }
    }

    let expires_at = payload
        .get("exp")
        .and_then(Value::as_f64)
        .and_then(|exp| DateTime::<Utc>::from_timestamp_millis((exp * 1000.0).round() as i64))
        .map(|at| at.to_rfc3339());

    Ok(json!({
        "header": header,
        "payload": payload,
        "expires_at": expires_at,
        "signature": token.signature_segment(),
    }))
}
