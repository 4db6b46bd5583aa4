//! Source maps for concatenated bundles.
//!
//! Concatenation never moves code within a line, so one mapping per output
//! line pointing at column zero of the original line is exact.

use parcel_sourcemap::{OriginalLocation, SourceMap, SourceMapError};

/// Concatenate `sources` (`name`, `content`) with `\n` and map every output
/// line back to its origin.
pub fn concat(sources: &[(String, String)]) -> Result<(String, SourceMap), SourceMapError> {
    let mut code = String::new();
    let mut map = SourceMap::new("/");
    let mut generated_line = 0;

    for (i, (name, content)) in sources.iter().enumerate() {
        if i > 0 {
            code.push('\n');
        }
        code.push_str(content);

        let source = map.add_source(name);
        map.set_source_content(source as usize, content)?;

        for original_line in 0..content.split('\n').count() as u32 {
            map.add_mapping(
                generated_line,
                0,
                Some(OriginalLocation::new(original_line, 0, source, None)),
            );
            generated_line += 1;
        }
    }

    Ok((code, map))
}
