//! Key generation command implementation.

use anyhow::Result;

use koala_core::LoginKey;

pub fn run() -> Result<()> {
    println!("{}", LoginKey::generate().to_base64());
    Ok(())
}
