use std::path::Path;

use miette::Result;
use terabridge::{Bridge, BridgeError};

pub fn run(file: String, config: String) -> Result<()> {
    let bridge = Bridge::from_path(Path::new(&config))?;
    let lexer = bridge.lexer()?;

    let source = std::fs::read_to_string(&file).map_err(|e| BridgeError::Io {
        context: format!("reading {file}"),
        source: e,
    })?;
    print!("{}", lexer.translate(&file, &source)?);
    Ok(())
}
