//! Patch parsing, token estimation, and greedy whole-hunk chunking

use regex::Regex;

use super::types::{DiffChunk, ParsedHunk};

/// Soft token budget applied when the caller does not supply one
pub const DEFAULT_MAX_TOKENS_PER_CHUNK: usize = 4000;

/// Trailing context lines carried across a chunk boundary
pub const OVERLAP_LINES: usize = 3;

/// Punctuation weighted more heavily than plain characters
const STRUCTURAL_CHARS: &str = "{}()[];,.<>!@#$%^&*+=|\\/\"'`~";

/// Cheap deterministic proxy for LLM token cost.
///
/// Not a real tokenizer; it only needs to be a stable, conservative
/// estimate that keeps chunks under budget in practice. Monotonically
/// non-decreasing as text is appended.
pub fn estimate_tokens(text: &str) -> usize {
    let base = text.chars().count() as f64 / 3.5;
    let structural = text
        .chars()
        .filter(|c| STRUCTURAL_CHARS.contains(*c))
        .count() as f64;
    let newlines = text.matches('\n').count() as f64;

    (base + structural * 0.5 + newlines * 0.2).ceil() as usize
}

/// Parse a patch into hunks in source order.
///
/// Lines that are neither hunk headers nor content (`+`/`-`/space) are
/// ignored, which makes trailing metadata harmless. An empty patch yields
/// an empty vec; this function never fails.
pub fn parse_diff_hunks(patch: &str) -> Vec<ParsedHunk> {
    let header_re = Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@(.*)?$").unwrap();

    let mut hunks = Vec::new();
    let mut current: Option<ParsedHunk> = None;

    for line in patch.lines() {
        if let Some(caps) = header_re.captures(line) {
            if let Some(hunk) = current.take() {
                hunks.push(hunk);
            }

            // Omitted lengths in a header default to 1
            current = Some(ParsedHunk {
                header: line.to_string(),
                old_start: caps[1].parse().unwrap_or(0),
                old_lines: caps.get(2).map_or(1, |m| m.as_str().parse().unwrap_or(1)),
                new_start: caps[3].parse().unwrap_or(0),
                new_lines: caps.get(4).map_or(1, |m| m.as_str().parse().unwrap_or(1)),
                lines: Vec::new(),
            });
        } else if let Some(hunk) = current.as_mut() {
            if line.starts_with('+') || line.starts_with('-') || line.starts_with(' ') {
                hunk.lines.push(line.to_string());
            }
        }
    }

    if let Some(hunk) = current.take() {
        hunks.push(hunk);
    }

    hunks
}

/// Up to the last [`OVERLAP_LINES`] lines of the previous chunk, with hunk
/// headers excluded, to be prepended to the next chunk as short context.
pub fn extract_overlap(previous_chunk: &[String]) -> Vec<String> {
    let context = previous_chunk.len().min(OVERLAP_LINES);

    previous_chunk[previous_chunk.len() - context..]
        .iter()
        .filter(|line| !line.starts_with("@@"))
        .cloned()
        .collect()
}

/// Greedily accumulate whole hunks into chunks under `max_tokens`.
///
/// A chunk closes only when adding the next hunk would exceed the budget
/// and the chunk already has content, so a single hunk larger than the
/// budget is kept atomic and overflows. Each new chunk after the first is
/// seeded with the overlap of the previous one. `None` or an empty patch
/// yields no chunks.
pub fn chunk_file_diff(patch: Option<&str>, max_tokens: usize) -> Vec<DiffChunk> {
    let patch = match patch {
        Some(p) if !p.is_empty() => p,
        _ => return Vec::new(),
    };

    let hunks = parse_diff_hunks(patch);
    if hunks.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = DiffChunk {
        old_start: hunks[0].old_start,
        old_lines: 0,
        new_start: hunks[0].new_start,
        new_lines: 0,
        content: String::new(),
        size_bytes: 0,
        header: String::new(),
    };
    let mut current_tokens = 0usize;
    let mut current_lines: Vec<String> = Vec::new();

    for hunk in &hunks {
        let mut hunk_content = Vec::with_capacity(hunk.lines.len() + 1);
        hunk_content.push(hunk.header.clone());
        hunk_content.extend(hunk.lines.iter().cloned());
        let hunk_tokens = estimate_tokens(&hunk_content.join("\n"));

        if current_tokens + hunk_tokens > max_tokens && !current_lines.is_empty() {
            current.content = current_lines.join("\n");
            current.size_bytes = current.content.len();
            chunks.push(current);

            let overlap = extract_overlap(&current_lines);

            current = DiffChunk {
                old_start: hunk.old_start,
                old_lines: hunk.old_lines,
                new_start: hunk.new_start,
                new_lines: hunk.new_lines,
                content: String::new(),
                size_bytes: 0,
                header: hunk.header.clone(),
            };

            current_lines = overlap;
            current_lines.push(hunk.header.clone());
            current_lines.extend(hunk.lines.iter().cloned());
            // Re-estimate so the carried overlap counts against the budget
            current_tokens = estimate_tokens(&current_lines.join("\n"));
        } else {
            current_lines.push(hunk.header.clone());
            current_lines.extend(hunk.lines.iter().cloned());
            current.old_lines += hunk.old_lines;
            current.new_lines += hunk.new_lines;
            current_tokens += hunk_tokens;
        }
    }

    if !current_lines.is_empty() {
        current.content = current_lines.join("\n");
        current.size_bytes = current.content.len();
        chunks.push(current);
    }

    tracing::debug!(
        original_size = patch.len(),
        chunks = chunks.len(),
        max_tokens,
        "diff chunked"
    );

    chunks
}

/// Render a chunk with aligned old/new line numbers.
///
/// `-` lines advance the old counter, `+` lines the new counter, context
/// lines both; hunk headers pass through unprefixed without advancing
/// either counter.
pub fn format_chunk_with_line_numbers(chunk: &DiffChunk) -> String {
    let mut formatted = Vec::new();
    let mut old_line = chunk.old_start;
    let mut new_line = chunk.new_start;

    for line in chunk.content.split('\n') {
        if line.starts_with("@@") {
            formatted.push(line.to_string());
        } else if line.starts_with('-') {
            formatted.push(format!("{:>6} - | {}", old_line, line));
            old_line += 1;
        } else if line.starts_with('+') {
            formatted.push(format!("       {:>6} + | {}", new_line, line));
            new_line += 1;
        } else {
            formatted.push(format!("{:>6} {:>6}   | {}", old_line, new_line, line));
            old_line += 1;
            new_line += 1;
        }
    }

    formatted.join("\n")
}

/// Structural atomicity check: every hunk header found in `content` must be
/// followed by exactly the add/remove counts it declares. Used as a test
/// oracle, not on the hot path.
pub fn is_complete_hunk(content: &str) -> bool {
    let header_re = Regex::new(r"^@@ -\d+(?:,(\d+))? \+\d+(?:,(\d+))? @@").unwrap();

    let mut in_hunk = false;
    let mut add_count = 0u32;
    let mut remove_count = 0u32;
    let mut expected_add = 0u32;
    let mut expected_remove = 0u32;

    for line in content.split('\n') {
        if let Some(caps) = header_re.captures(line) {
            if in_hunk && (add_count != expected_add || remove_count != expected_remove) {
                return false;
            }

            in_hunk = true;
            expected_remove = caps.get(1).map_or(1, |m| m.as_str().parse().unwrap_or(1));
            expected_add = caps.get(2).map_or(1, |m| m.as_str().parse().unwrap_or(1));
            add_count = 0;
            remove_count = 0;
        } else if in_hunk {
            if line.starts_with('+') {
                add_count += 1;
            } else if line.starts_with('-') {
                remove_count += 1;
            } else if line.starts_with(' ') {
                add_count += 1;
                remove_count += 1;
            }
        }
    }

    !in_hunk || (add_count == expected_add && remove_count == expected_remove)
}
