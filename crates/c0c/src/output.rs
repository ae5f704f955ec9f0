//! Output sinks and token dumps.

use c0_common::TokenFormat;
use c0_compiler::frontend::Token;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Path naming standard input or standard output.
pub const STDIO: &str = "-";

/// Write `bytes` to `path`, or to standard output for `-`.
///
/// The file is only created once there is something to write.
pub fn write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if path == Path::new(STDIO) {
        let mut out = io::stdout().lock();
        out.write_all(bytes)?;
        return out.flush();
    }
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(bytes)?;
    file.flush()
}

/// Render tokens in the requested format.
pub fn render_tokens(tokens: &[Token], format: TokenFormat) -> serde_json::Result<Vec<u8>> {
    match format {
        TokenFormat::Text => Ok(tokens
            .iter()
            .map(|token| format!("{token}\n"))
            .collect::<String>()
            .into_bytes()),
        TokenFormat::Json => {
            let mut out = serde_json::to_vec_pretty(tokens)?;
            out.push(b'\n');
            Ok(out)
        }
    }
}
