//! Ledger Internet Computer Identity CLI Example
//!
//! This example demonstrates the library against a physical Ledger device
//! over USB HID.
//!
//! # Prerequisites
//!
//! - A Ledger device (Nano S/S Plus/X) with the Internet Computer app
//!   installed and open
//! - On Linux: udev rules granting access to Ledger HID devices
//!
//! # Quick Start
//!
//! ```bash
//! cargo run --example ledger-cli -p ic-identity-ledger --features hid -- list
//! cargo run --example ledger-cli -p ic-identity-ledger --features hid -- address
//! cargo run --example ledger-cli -p ic-identity-ledger --features hid -- sign 0xdeadbeef
//! ```
//!
//! # Commands
//!
//! | Command      | Description                                          |
//! |--------------|------------------------------------------------------|
//! | `list`       | List connected Ledger devices                        |
//! | `version`    | Show the app version on the device                   |
//! | `address`    | Derive and print the principal and public key        |
//! | `show`       | Display the address on the device for verification   |
//! | `sign <hex>` | Sign an arbitrary payload (confirm on the device)    |
//!
//! All commands use the default derivation path `m/44'/223'/0'/0/0`; pass
//! a different path as the last argument to override it.

#![expect(unused_crate_dependencies, reason = "needed for CLI example")]

use std::env;

use ic_identity_ledger::{
    DerivationPath, DeviceSession, HidTransport, LedgerIdentity, SigningIdentity,
};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return;
    }

    match args[1].as_str() {
        "list" => cmd_list(),
        "version" => cmd_version().await,
        "address" => cmd_address(path_arg(&args[2..])).await,
        "show" => cmd_show(path_arg(&args[2..])).await,
        "sign" => cmd_sign(&args[2..]).await,
        "--help" | "-h" | "help" => print_help(),
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_help();
        }
    }
}

fn print_help() {
    println!(
        r#"Ledger Internet Computer Identity CLI

USAGE:
    ledger-cli <COMMAND>

COMMANDS:
    list          List connected Ledger devices
    version       Show the Internet Computer app version
    address       Derive and print the principal and public key
    show          Display the address on the device screen
    sign <hex>    Sign a payload (requires confirmation on the device)
    help          Show this help message

EXAMPLES:
    cargo run --example ledger-cli --features hid -- list
    cargo run --example ledger-cli --features hid -- address
    cargo run --example ledger-cli --features hid -- sign 0xdeadbeef
"#
    );
}

/// Parses an optional trailing derivation path argument.
fn path_arg(args: &[String]) -> DerivationPath {
    match args.first() {
        Some(text) => match text.parse() {
            Ok(path) => path,
            Err(e) => {
                eprintln!("Invalid derivation path: {e}");
                std::process::exit(1);
            }
        },
        None => DerivationPath::default(),
    }
}

fn cmd_list() {
    match HidTransport::list_devices() {
        Ok(devices) if devices.is_empty() => {
            println!("No Ledger devices found.");
            println!();
            println!("Make sure your Ledger is plugged in and unlocked.");
        }
        Ok(devices) => {
            println!("Found {} Ledger device(s):", devices.len());
            for (i, device) in devices.iter().enumerate() {
                println!("  [{}] {}", i + 1, device);
            }
        }
        Err(e) => eprintln!("Error listing devices: {e}"),
    }
}

async fn cmd_version() {
    let transport = match HidTransport::open() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Failed to connect: {e}");
            return;
        }
    };

    let mut session = DeviceSession::new(Box::new(transport));
    match session.version().await {
        Ok(version) => println!("Internet Computer app {version}"),
        Err(e) => eprintln!("Failed to read version: {e}"),
    }
}

async fn cmd_address(path: DerivationPath) {
    let identity = match connect(path).await {
        Some(identity) => identity,
        None => return,
    };

    println!("Derivation Path:");
    println!("  {}", identity.path());
    println!();
    println!("Principal:");
    println!("  {}", identity.principal());
    println!();
    println!("Public Key (uncompressed):");
    println!("  {}", identity.public_key());
}

async fn cmd_show(path: DerivationPath) {
    let mut identity = match connect(path).await {
        Some(identity) => identity,
        None => return,
    };

    println!("Verify the address on the device screen...");
    match identity.show_address_and_public_key_on_device().await {
        Ok(()) => println!("Confirmed on device."),
        Err(e) => eprintln!("Not confirmed: {e}"),
    }
}

async fn cmd_sign(args: &[String]) {
    let Some(payload_hex) = args.first() else {
        eprintln!("Usage: sign <hex-payload> [derivation-path]");
        return;
    };

    let payload_hex = payload_hex.strip_prefix("0x").unwrap_or(payload_hex);
    let payload = match hex::decode(payload_hex) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Invalid hex: {e}");
            return;
        }
    };

    let mut identity = match connect(path_arg(&args[1..])).await {
        Some(identity) => identity,
        None => return,
    };

    println!("Signing {} bytes (confirm on the device)...", payload.len());
    match identity.sign(&payload).await {
        Ok(signature) => {
            println!();
            println!("Signature (r || s):");
            println!("  {signature}");
        }
        Err(e) => eprintln!("Signing failed: {e}"),
    }
}

/// Opens the first Ledger and builds a verified identity on `path`.
async fn connect(path: DerivationPath) -> Option<LedgerIdentity> {
    let transport = match HidTransport::open() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Failed to connect: {e}");
            eprintln!();
            eprintln!("Make sure:");
            eprintln!("  - Your Ledger is plugged in and unlocked");
            eprintln!("  - The Internet Computer app is open");
            return None;
        }
    };

    match LedgerIdentity::create(Box::new(transport), path).await {
        Ok(identity) => Some(identity),
        Err(e) => {
            eprintln!("Failed to build identity: {e}");
            None
        }
    }
}
