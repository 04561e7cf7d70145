use clap::{Parser, Subcommand};
use colored_json::{Color, ColorMode, Output, Styler, ToColoredJson};
use iab_tcf::{peek_version, ConsentRecord};

mod logging;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Logging directives, RUST_LOG takes precedence when set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    /// Print logs in a human readable format instead of JSON
    #[arg(long, global = true)]
    pretty_logs: bool,
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a consent string and display it in the console
    Decode {
        /// Consent string to decode
        consent_string: String,
        /// Fail on invalid strings instead of displaying a stub record
        #[arg(short, long)]
        strict: bool,
    },
    /// Display the consent status of vendors and purposes
    Query {
        /// Consent string to decode
        consent_string: String,
        /// Vendor ID to query, may be repeated
        #[arg(short, long)]
        vendor: Vec<u16>,
        /// Purpose ID to query, may be repeated
        #[arg(short, long)]
        purpose: Vec<u8>,
    },
    /// Display the version of a consent string
    Version {
        /// Consent string to inspect
        consent_string: String,
    },
}

fn main() {
    let args = Cli::parse();
    logging::setup_logging(&args.log_level, args.pretty_logs);

    let e = match args.cmd {
        Commands::Decode {
            consent_string,
            strict,
        } => decode_consent_string(&consent_string, strict),
        Commands::Query {
            consent_string,
            vendor,
            purpose,
        } => query_consent_string(&consent_string, &vendor, &purpose),
        Commands::Version { consent_string } => print_version(&consent_string),
    };

    if let Err(e) = e {
        tracing::error!(error = %e, "command failed");
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn decode_consent_string(s: &str, strict: bool) -> Result<(), Box<dyn std::error::Error>> {
    let record = if strict {
        ConsentRecord::try_decode(s)?
    } else {
        ConsentRecord::decode(s)
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&record)?
            .to_colored_json_with_styler(ColorMode::Auto(Output::StdOut), json_color_styler())?
    );

    Ok(())
}

fn query_consent_string(
    s: &str,
    vendors: &[u16],
    purposes: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    let record = ConsentRecord::decode(s);
    if record.is_stub() {
        tracing::warn!("consent string could not be decoded, nothing is consented");
    }

    println!("kind\tid\tconsent\tlegitimate_interest");
    for &id in purposes {
        println!(
            "purpose\t{}\t{}\t{}",
            id,
            record.is_purpose_consented(id),
            record.is_purpose_legit_interest_established(id)
        );
    }
    for &id in vendors {
        println!(
            "vendor\t{}\t{}\t{}",
            id,
            record.is_vendor_consented(id),
            record.is_vendor_legit_interest_established(id)
        );
    }

    Ok(())
}

fn print_version(s: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", peek_version(s)?);
    Ok(())
}

fn json_color_styler() -> Styler {
    Styler {
        key: Color::Green.foreground(),
        string_value: Color::Blue.bold(),
        integer_value: Color::Magenta.bold(),
        float_value: Color::Magenta.italic(),
        object_brackets: Color::Yellow.bold(),
        array_brackets: Color::Cyan.bold(),
        ..Default::default()
    }
}
