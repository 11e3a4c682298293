//! `auditrec generate`: messy synthetic GL/Bank exports for demos and
//! end-to-end tests.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use clap::Args;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::exit_codes::{EXIT_RECON_RUNTIME, EXIT_USAGE};
use crate::CliError;

pub const GL_FILE: &str = "gl.csv";
pub const BANK_FILE: &str = "bank.csv";
pub const CONFIG_FILE: &str = "recon.toml";

const COMPANIES: &[&str] = &[
    "Acme Corporation",
    "Globex Industries",
    "Initech Services",
    "Umbrella Holdings",
    "Stark Logistics",
    "Wayne Enterprises",
    "Cyberdyne Systems",
    "Soylent Foods",
    "Wonka Confections",
    "Tyrell Manufacturing",
    "Hooli Cloud Services",
    "Vandelay Imports",
    "Pied Piper Storage",
    "Dunder Mifflin Paper",
    "Oscorp Chemicals",
    "Massive Dynamic",
];

const UNCLEARED_CHECKS: usize = 15;
const BANK_FEES: usize = 10;
const BANK_FEE: f64 = -15.00;
const BATCH_PART: f64 = -100.00;
const PERIOD_DAYS: i64 = 28;

#[derive(Args)]
pub struct GenerateArgs {
    /// Directory to write gl.csv, bank.csv and recon.toml into
    pub dir: PathBuf,

    /// RNG seed; the same seed always produces the same files
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of business transactions to post
    #[arg(long, default_value_t = 100)]
    pub count: usize,
}

/// One generated ledger line, already in its exported (messy) form.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    pub date: String,
    pub description: String,
    pub amount: String,
}

#[derive(Debug, Default)]
pub struct Dataset {
    pub gl: Vec<Row>,
    pub bank: Vec<Row>,
}

pub fn cmd_generate(args: GenerateArgs) -> Result<(), CliError> {
    if args.count == 0 {
        return Err(CliError::new(EXIT_USAGE, "--count must be at least 1"));
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    let data = generate(seed, args.count);

    write_dataset(&data, &args.dir)
        .map_err(|e| CliError::new(EXIT_RECON_RUNTIME, format!("cannot write {}: {e}", args.dir.display())))?;

    eprintln!(
        "wrote {} GL and {} Bank rows to {} (seed {seed})",
        data.gl.len(),
        data.bank.len(),
        args.dir.display(),
    );
    eprintln!("next: auditrec run {}", args.dir.join(CONFIG_FILE).display());
    Ok(())
}

/// Build the dataset. Deterministic for a given seed.
///
/// Most transactions clear the bank verbatim, some clear under a noisy
/// description, and some clear three days late. On top of that the GL carries
/// uncleared checks, the bank carries service fees, and one three-part GL
/// batch settles as a single bank line.
pub fn generate(seed: u64, count: usize) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = period_start();
    let mut data = Dataset::default();

    for i in 0..count {
        let company = COMPANIES.choose(&mut rng).copied().unwrap_or("Acme Corporation");
        let date = start + Duration::days(rng.gen_range(0..PERIOD_DAYS));
        let cents: i64 = rng.gen_range(2_500..500_000);
        let amount = if rng.gen_bool(0.7) { -(cents as f64) / 100.0 } else { cents as f64 / 100.0 };

        data.gl.push(Row {
            id: format!("GL-{:04}", i + 1),
            date: date.format("%Y-%m-%d").to_string(),
            description: messy_description(&mut rng, company),
            amount: messy_amount(&mut rng, amount),
        });

        let roll: f64 = rng.gen();
        let (bank_date, bank_desc) = if roll < 0.85 {
            (date, company.to_uppercase())
        } else if roll < 0.95 {
            (date, noisy_description(&mut rng, company))
        } else {
            (date + Duration::days(3), company.to_uppercase())
        };
        data.bank.push(Row {
            id: String::new(),
            date: bank_date.format("%m/%d/%Y").to_string(),
            description: bank_desc,
            amount: format!("{amount:.2}"),
        });
    }

    for n in 0..UNCLEARED_CHECKS {
        let date = start + Duration::days(rng.gen_range(PERIOD_DAYS - 7..PERIOD_DAYS));
        let cents: i64 = rng.gen_range(5_000..250_000);
        let id = data.gl.len() + 1;
        data.gl.push(Row {
            id: format!("GL-{id:04}"),
            date: date.format("%Y-%m-%d").to_string(),
            description: format!("Check #{}", 1001 + n),
            amount: messy_amount(&mut rng, -(cents as f64) / 100.0),
        });
    }

    for _ in 0..BANK_FEES {
        let date = start + Duration::days(rng.gen_range(0..PERIOD_DAYS));
        data.bank.push(Row {
            id: String::new(),
            date: date.format("%m/%d/%Y").to_string(),
            description: "MONTHLY SERVICE FEE".to_string(),
            amount: format!("{BANK_FEE:.2}"),
        });
    }

    // Batch: posted on the last day so no other GL line shares its date.
    let batch_date = start + Duration::days(PERIOD_DAYS);
    for part in ["A", "B", "C"] {
        let id = data.gl.len() + 1;
        data.gl.push(Row {
            id: format!("GL-{id:04}"),
            date: batch_date.format("%Y-%m-%d").to_string(),
            description: format!("Vendor payment part {part}"),
            amount: messy_amount(&mut rng, BATCH_PART),
        });
    }
    data.bank.push(Row {
        id: String::new(),
        date: batch_date.format("%m/%d/%Y").to_string(),
        description: "BATCH SETTLEMENT TOTAL".to_string(),
        amount: format!("{:.2}", BATCH_PART * 3.0),
    });

    data.bank.shuffle(&mut rng);
    for (i, row) in data.bank.iter_mut().enumerate() {
        row.id = format!("BK-{:04}", i + 1);
    }

    data
}

fn period_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default()
}

/// GL descriptions as a bookkeeper types them: stray padding, random case.
fn messy_description(rng: &mut StdRng, company: &str) -> String {
    let body = match rng.gen_range(0..3) {
        0 => company.to_lowercase(),
        1 => company.to_uppercase(),
        _ => company.to_string(),
    };
    let lead = " ".repeat(rng.gen_range(0..3));
    let trail = " ".repeat(rng.gen_range(0..3));
    format!("{lead}{body}{trail}")
}

/// Amounts as spreadsheets export them: plain, currency-formatted, or
/// accounting parentheses for outflows.
fn messy_amount(rng: &mut StdRng, amount: f64) -> String {
    match rng.gen_range(0..3) {
        0 => format!("{amount:.2}"),
        1 if amount < 0.0 => format!("({})", currency(-amount)),
        _ if amount < 0.0 => format!("-{}", currency(-amount)),
        _ => currency(amount),
    }
}

fn currency(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${grouped}.{:02}", cents % 100)
}

/// Bank descriptors: the payee name with a dropped letter or a terminal
/// reference appended.
fn noisy_description(rng: &mut StdRng, company: &str) -> String {
    let upper = company.to_uppercase();
    if rng.gen_bool(0.5) {
        let positions: Vec<usize> = upper
            .char_indices()
            .filter(|(_, c)| c.is_ascii_alphabetic())
            .map(|(i, _)| i)
            .collect();
        match positions.choose(rng) {
            Some(&i) => format!("{}{}", &upper[..i], &upper[i + 1..]),
            None => upper,
        }
    } else {
        format!("{upper} #{}", rng.gen_range(10..100))
    }
}

fn write_rows(rows: &[Row], path: &Path) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["uid", "date", "desc", "amount"])?;
    for r in rows {
        writer.write_record([&r.id, &r.date, &r.description, &r.amount])?;
    }
    writer.flush()?;
    Ok(())
}

fn config_toml() -> String {
    format!(
        "\
name = \"Synthetic close\"

[gl]
file = \"{GL_FILE}\"

[bank]
file = \"{BANK_FILE}\"

[output]
xlsx = \"Audit_Exception_Report.xlsx\"
"
    )
}

pub fn write_dataset(data: &Dataset, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    write_rows(&data.gl, &dir.join(GL_FILE))?;
    write_rows(&data.bank, &dir.join(BANK_FILE))?;
    std::fs::write(dir.join(CONFIG_FILE), config_toml())?;
    Ok(())
}
