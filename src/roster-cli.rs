//! A simple CLI tool for checking voter rosters before uploading them.
//! This uses the server's own roster parser, so a roster it accepts will
//! also be accepted by `POST /admin`.

use clap::{Arg, ArgAction, ArgMatches, Command};

use votebox_backend::model::{
    roster::{read_roster, write_roster, RosterError},
    voter::{NewVoter, DOB_FORMAT},
};

const PROGRAM_NAME: &str = "roster-cli";

const ABOUT_TEXT: &str = "Check a voter roster before uploading it.

EXIT CODES:
     0: The roster is valid.
   255: Ran successfully, but the roster is invalid.
 Other: Error.";

const ROSTER_PATH: &str = "ROSTER_PATH";

const ROSTER_PATH_HELP: &str =
    "The path to a CSV or `.xlsx` roster with `ID`, `Name` and `DOB` columns";

const NORMALIZE: &str = "normalize";

const NORMALIZE_HELP: &str = "Print the roster in canonical form (`ID,Name,DOB`, no extra \
columns) instead of listing the voters";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(ROSTER_PATH)
                .help(ROSTER_PATH_HELP)
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(NORMALIZE)
                .long(NORMALIZE)
                .short('n')
                .help(NORMALIZE_HELP)
                .action(ArgAction::SetTrue),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// The roster was rejected for the contained reason.
    Roster(RosterError),
}

/// Load and validate the roster at the given path.
fn check(path: &str) -> Result<Vec<NewVoter>, Error> {
    let bytes = std::fs::read(path).map_err(|e| Error::IO(e.to_string()))?;
    read_roster(&bytes).map_err(Error::Roster)
}

fn describe(voter: &NewVoter) -> String {
    format!(
        "{}: {} (born {})",
        voter.id,
        voter.name,
        voter.dob.format(DOB_FORMAT)
    )
}

/// Check the roster, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let path: &String = args.get_one(ROSTER_PATH).unwrap(); // Required argument is guaranteed to be present.
    match check(path) {
        Ok(voters) if args.get_flag(NORMALIZE) => {
            print!("{}", write_roster(&voters));
            0
        }
        Ok(voters) => {
            println!(
                "Roster is valid: {} voter{}.",
                voters.len(),
                if voters.len() != 1 { "s" } else { "" }
            );
            for voter in &voters {
                println!("{}", describe(voter));
            }
            0
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {msg}");
            1
        }
        Err(Error::Roster(err)) => {
            println!("Roster is invalid: {err}");
            255
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
