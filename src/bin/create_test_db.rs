use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{Duration, OffsetDateTime};

use vetri_finance::{
    Transaction, TransactionKind, bulk_create_transactions, count_users, create_user,
    initialize_db,
};

/// A utility for creating a test database for the Vetri Finance API server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The username of the test user.
    #[arg(long, short, default_value = "test")]
    username: String,

    /// How many days of transactions to create, ending today.
    #[arg(long, short, default_value_t = 90)]
    days: i64,
}

const EXPENSES: [(&str, i64); 5] = [
    ("Groceries", 84_35),
    ("Coffee", 4_50),
    ("Bus fare", 3_20),
    ("Electricity", 121_80),
    ("Dinner out", 56_00),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user {:?}...", args.username);
    let user = create_user(&args.username, &conn)?;

    let today = OffsetDateTime::now_utc().date();
    let mut transactions = Vec::new();

    for day in 0..args.days {
        let date = today - Duration::days(day);

        if date.day() == 1 {
            transactions.push(Transaction::build(
                user.id,
                "Salary",
                Decimal::new(4_250_00, 2),
                TransactionKind::Income,
                date,
            ));
        }

        let (title, cents) = EXPENSES[(day as usize) % EXPENSES.len()];
        transactions.push(
            Transaction::build(user.id, title, Decimal::new(cents, 2), TransactionKind::Expense, date)
                .notes((day % 7 == 0).then(|| "Weekly".to_owned())),
        );
    }

    println!("Creating {} transactions...", transactions.len());
    bulk_create_transactions(transactions, &conn)?;

    println!("Success! The database has {} user(s).", count_users(&conn)?);
    println!("Send requests with the header \"x-owner-id: {}\".", user.id);

    Ok(())
}
