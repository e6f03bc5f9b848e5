use crate::model::section::{Section, Sections};
use crate::ops::dock_ops::DockError;
use crate::ops::locate::locate;

/// Where a tile will be inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub section: Section,
    pub index: usize,
}

/// Placement request as given on the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct PlacementSpec<'a> {
    /// Keyword or (signed) 1-based index
    pub position: Option<&'a str>,
    pub before: Option<&'a str>,
    pub after: Option<&'a str>,
}

/// Convert a position token to a 0-based insertion index for a section of
/// length `len`.
///
/// Keywords: `beginning|begin|first|start`, `end|last`, `middle|center`.
/// Plain integers are 1-based absolute slots; integers with an explicit
/// `+`/`-` sign are relative to `original_index` (the 0-based index the tile
/// occupied before it was taken out). Out-of-range results clamp to the
/// section bounds.
pub fn resolve_token(token: &str, len: usize, original_index: usize) -> Result<usize, DockError> {
    // `\-1` is how a negative offset gets past option parsing
    let token = token.trim_start_matches('\\');
    match token {
        "beginning" | "begin" | "first" | "start" => return Ok(0),
        "end" | "last" => return Ok(len),
        "middle" | "center" => return Ok(len / 2),
        _ => {}
    }

    let offset: i64 = token
        .parse()
        .map_err(|_| DockError::InvalidPosition(token.to_string()))?;

    let mut effective = if token.starts_with('+') || token.starts_with('-') {
        offset.saturating_add(original_index as i64 + 1)
    } else {
        offset
    };
    effective = effective.saturating_sub(1);

    if effective > len as i64 {
        Ok(len)
    } else if effective < 0 {
        Ok(0)
    } else {
        Ok(effective as usize)
    }
}

/// Resolve a full placement request.
///
/// A position token always wins. Otherwise an `after` (then `before`) anchor
/// is looked up across all sections and the tile lands next to it, in the
/// anchor's own section. A missing anchor, or no request at all, appends to
/// `destination`.
pub fn resolve(
    sections: &Sections,
    destination: Section,
    spec: &PlacementSpec<'_>,
    original_index: usize,
) -> Result<Placement, DockError> {
    if let Some(token) = spec.position {
        let index = resolve_token(token, sections.len(destination), original_index)?;
        return Ok(Placement {
            section: destination,
            index,
        });
    }

    let append = Placement {
        section: destination,
        index: sections.len(destination),
    };

    if let Some(anchor) = spec.after {
        return Ok(match locate(sections, anchor) {
            Some((section, index)) => Placement {
                section,
                index: index + 1,
            },
            None => {
                tracing::warn!(anchor, "relative item not found, appending");
                append
            }
        });
    }

    if let Some(anchor) = spec.before {
        return Ok(match locate(sections, anchor) {
            Some((section, index)) => Placement { section, index },
            None => {
                tracing::warn!(anchor, "relative item not found, appending");
                append
            }
        });
    }

    Ok(append)
}
