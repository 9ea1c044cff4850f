//! The `tools` subcommand: a catalogue listing for configuration front-ends.

use std::fmt::{self, Write};

use forgemcp::{Error, Result, ServerTool, ToolsetGroup, governor::estimate_tokens};

/// One tool in the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolEntry {
    /// Tool name.
    pub name: String,
    /// First sentence of the description.
    pub summary: String,
    /// Whether the tool leaves remote state untouched.
    pub read_only: bool,
    /// Estimated tokens the tool definition costs a client.
    pub tokens: usize,
}

/// One toolset in the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolsetEntry {
    /// Toolset id.
    pub id: String,
    /// Toolset description.
    pub description: String,
    /// Read and write tools, sorted by name.
    pub tools: Vec<ToolEntry>,
}

/// The first sentence of a description.
pub fn first_sentence(description: &str) -> &str {
    match description.find(". ") {
        Some(idx) => &description[..=idx],
        None => description,
    }
}

/// Render a token count, using a `K` suffix from a thousand up.
pub fn format_tokens(count: usize) -> String {
    if count >= 1000 {
        format!("{:.1}K", count as f64 / 1000.0)
    } else {
        count.to_string()
    }
}

fn entry(tool: &ServerTool) -> Result<ToolEntry> {
    let definition = serde_json::to_string(tool.tool())?;
    Ok(ToolEntry {
        name: tool.name().to_string(),
        summary: first_sentence(tool.description()).to_string(),
        read_only: tool.is_read_only(),
        tokens: estimate_tokens(&definition),
    })
}

/// Toolsets and their tools, both sorted by name.
pub fn catalogue(group: &ToolsetGroup) -> Result<Vec<ToolsetEntry>> {
    let mut toolsets = Vec::new();
    for toolset in group.toolsets() {
        let mut tools = toolset
            .available_tools(false)
            .into_iter()
            .map(entry)
            .collect::<Result<Vec<_>>>()?;
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        toolsets.push(ToolsetEntry {
            id: toolset.id().to_string(),
            description: toolset.description().to_string(),
            tools,
        });
    }
    toolsets.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(toolsets)
}

/// Render the listing, followed by the `--tools` argument for `selection`.
///
/// Every selected name must exist in the catalogue.
pub fn render(toolsets: &[ToolsetEntry], selection: &[String]) -> Result<String> {
    let mut total = 0;
    for name in selection {
        let tool = toolsets
            .iter()
            .flat_map(|toolset| &toolset.tools)
            .find(|tool| &tool.name == name)
            .ok_or_else(|| Error::InvalidConfiguration(format!("unknown tool: {name}")))?;
        total += tool.tokens;
    }
    let mut out = String::new();
    write_listing(&mut out, toolsets, selection, total)
        .map_err(|err| Error::InternalError(format!("failed to render listing: {err}")))?;
    Ok(out)
}

fn write_listing(
    out: &mut String,
    toolsets: &[ToolsetEntry],
    selection: &[String],
    total: usize,
) -> fmt::Result {
    for toolset in toolsets {
        writeln!(out, "{} - {}", toolset.id, toolset.description)?;
        for tool in &toolset.tools {
            let flag = if tool.read_only { "r" } else { "w" };
            writeln!(
                out,
                "  [{flag}] {} (~{} tokens) {}",
                tool.name,
                format_tokens(tool.tokens),
                tool.summary
            )?;
        }
    }
    if selection.is_empty() {
        return Ok(());
    }
    writeln!(
        out,
        "\nSelected {} tools, ~{} tokens",
        selection.len(),
        format_tokens(total)
    )?;
    writeln!(out, "forgemcp stdio --tools {}", selection.join(","))
}
