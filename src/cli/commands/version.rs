use anyhow::Result;

use crate::cli::Output;
use crate::{PKG_DESCRIPTION, PKG_NAME, VERSION};

pub fn execute(output: &Output) -> Result<()> {
    output.document(&format!("{PKG_NAME} {VERSION}"));
    if !output.is_quiet() {
        println!("{PKG_DESCRIPTION}");
    }
    Ok(())
}
