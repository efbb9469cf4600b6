//! Minimal `/etc/shadow` entry generator and checker, using the [`hash::shacrypt`
//! API](https://docs.rs/natron/latest/natron/hash/shacrypt/index.html).
//!
//! This is only intended as an example to demonstrate usage of this library. It does not edit any
//! real shadow file: the entry is just printed, in the `user:hash:...` form `chpasswd -e` and
//! `/etc/shadow` use.
//!
//! ## Example usage:
//!
//! To create an entry for the user "alice", hashed with SHA-512-crypt and 100000 rounds:
//!
//! ```bash
//! cargo run --release --example shadow-entry new alice sha512 100000
//! ```
//!
//! And to check a password against an existing entry (quote it, it contains `$` characters):
//!
//! ```bash
//! cargo run --release --example shadow-entry check 'alice:$6$rounds=100000$...'
//! ```

use natron::hash::shacrypt::{HashConfig, ShaCryptError, Variant, Verifier};
use natron::NatronError;

/// The largest round count we're willing to verify: anything above this is probably an attempt to
/// make us spin.
const MAX_ROUNDS: u32 = 10_000_000;

/// Prints a new shadow entry for `user`.
fn new_entry(user: &str, variant: Variant, rounds: u32, password: &[u8]) {
    let config = HashConfig {
        variant,
        rounds,
        ..Default::default()
    };

    println!("Hashing...");
    let hash = config.hash(password).unwrap();

    // Days since the epoch of the last password change, then the usual aging fields
    let last_change = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
        / 86400;
    println!("{}:{}:{}:0:99999:7:::", user, hash, last_change);
}

/// Checks `password` against the hash field of a shadow `entry`.
fn check_entry(entry: &str, password: &[u8]) {
    let mut fields = entry.split(':');
    let user = fields.next().unwrap();
    let hash = fields.next().expect("entry has no hash field");

    match Verifier::new(MAX_ROUNDS).verify(password, hash) {
        Ok(()) => println!("Password correct for {}", user),
        Err(NatronError::ShaCryptError(ShaCryptError::Mismatch)) => {
            println!("Password incorrect for {}", user)
        }
        Err(err) => println!("Could not check entry: {}", err),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let usage = || {
        eprintln!("Usage: shadow-entry new user [sha256|sha512] [rounds]");
        eprintln!("       shadow-entry check entry");
    };

    if args.len() < 3 {
        usage();
        return;
    }

    // Ask the user to input a password
    let mut password = rpassword::prompt_password("Password: ")
        .unwrap()
        .into_bytes();

    match args[1].as_str() {
        "new" => {
            let variant = match args.get(3).map(String::as_str) {
                None | Some("sha512") => Variant::Sha512,
                Some("sha256") => Variant::Sha256,
                Some(other) => panic!("Unrecognised variant {}", other),
            };
            let rounds = args
                .get(4)
                .map(|r| r.parse().unwrap())
                .unwrap_or(natron::hash::shacrypt::ROUNDS_DEFAULT);

            new_entry(&args[2], variant, rounds, &password);
        }
        "check" => check_entry(&args[2], &password),
        _ => usage(),
    }

    // Clear the password from memory
    natron::mem::clear(&mut password).unwrap();
}
