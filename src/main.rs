use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
mod auth;
use scrypt_bridge::{CallResult, Config, Encoding, HostBuffer, ScryptBridge};
use serde_json::{Value, json};

const DEFAULT_PARAMS: &str = r#"{"N": 16384, "r": 8, "p": 1}"#;

#[derive(Debug, Parser)]
#[command(name = "scrypt-bridge")]
#[command(
    version,
    about = "Derive, hash and verify scrypt keys through the host marshalling layer."
)]
struct Cli {
    /// Scrypt cost parameters as a JSON object with N, r and p
    #[arg(long, global = true, value_name = "JSON", env = "SCRYPT_BRIDGE_PARAMS", default_value = DEFAULT_PARAMS)]
    params: String,

    /// Configuration object as JSON (keyEncoding, saltEncoding, hashEncoding, outputEncoding, outputLength, checkEmpty)
    #[arg(long, global = true, value_name = "JSON", env = "SCRYPT_BRIDGE_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Derives a key from the password and a salt
    #[command(arg_required_else_help = true)]
    Kdf {
        /// Salt, decoded with the configured saltEncoding
        #[arg(long)]
        salt: String,
    },

    /// Hashes the password with a random salt
    Hash,

    /// Checks the password against a hash
    #[command(arg_required_else_help = true)]
    Verify { hash: String },
}

fn parse_json(flag: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text).with_context(|| format!("{flag} is not valid JSON"))
}

// Raw buffers are shown as hex on a terminal.
fn printable(encoding: Encoding) -> Encoding {
    match encoding {
        Encoding::Buffer => Encoding::Hex,
        other => other,
    }
}

fn render<T>(outcome: CallResult<T>, show: impl FnOnce(&T) -> Value) -> (Value, bool) {
    let ok = outcome.is_ok();
    let value = json!({
        "err": outcome.err(),
        "result": outcome.result().map(show),
    });
    (value, ok)
}

fn encoded(buffer: &HostBuffer, encoding: Encoding) -> Value {
    Value::String(printable(encoding).encode(buffer.as_slice()))
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Cli::parse();
    let params = parse_json("--params", &args.params)?;
    let config = match &args.config {
        Some(text) => parse_json("--config", text)?,
        None => Value::Null,
    };
    // Encodings for display only; the bridge reports config errors itself.
    let display = Config::parse(&config).unwrap_or_default();

    let bridge = ScryptBridge::new();
    let (output, ok) = match args.command {
        Commands::Kdf { salt } => {
            let password = auth::read_password()?;
            render(bridge.kdf(password, salt, &params, &config), |key| {
                encoded(key, display.output_encoding())
            })
        }
        Commands::Hash => {
            let password = auth::read_new_password_with_confirmation()?;
            render(bridge.hash(password, &params, &config), |hash| {
                encoded(hash, display.hash_encoding())
            })
        }
        Commands::Verify { hash } => {
            let password = auth::read_password()?;
            render(bridge.verify(hash, password, &config), |matches| {
                Value::Bool(*matches)
            })
        }
    };

    println!("{output}");
    if !ok {
        std::process::exit(1);
    }

    Ok(())
}
