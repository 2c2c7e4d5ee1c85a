//! Builds the instruction text sent to the generation API.
//!
//! The prompt is assembled from four parts: a role preamble naming the
//! target system, the guidance block for the dialect's family, the output
//! contract (four sections in fixed order), and the user's query inside a
//! fenced code block. Building is pure and deterministic.

use crate::dialect::{Dialect, DialectFamily};

/// Section headers the model must produce, in order.
pub const SECTION_HEADERS: [&str; 4] = [
    "### Summary",
    "### Identified Issues",
    "### Optimized Code/Query",
    "### Explanation of Changes",
];

/// Guidance used when the dialect identifier is not in the registry.
pub const GENERIC_GUIDANCE: &str = "*   **General SQL**: Focus on indexing for filter and join columns, \
efficient join strategies, selective predicates, and avoiding full table scans and `SELECT *`.";

/// Guidance block keyed by dialect family. Each focus area is listed once.
pub fn family_guidance(family: DialectFamily) -> &'static str {
    match family {
        DialectFamily::Warehouse => {
            "*   **Data Warehouses (BigQuery, Snowflake, Redshift, Azure Synapse)**: Focus on partitioning, \
clustering, distribution/sort keys. Identify expensive joins and data shuffling."
        }
        DialectFamily::Relational => {
            "*   **Relational (MySQL, PostgreSQL)**: Focus on indexing (B-Tree, Trigram), inefficient joins, \
and N+1 problems."
        }
        DialectFamily::Document => {
            "*   **MongoDB**: Analyze aggregation pipelines and recommend optimal indexes (compound, covered queries)."
        }
        DialectFamily::KeyValue => {
            "*   **DynamoDB**: Advise against `Scan` operations. Recommend `Query` operations with optimal keys \
and indexes (GSIs/LSIs)."
        }
    }
}

/// Guidance for a raw identifier, falling back to generic relational advice.
pub fn guidance_for(dialect_id: &str) -> &'static str {
    match Dialect::parse(dialect_id) {
        Some(dialect) => family_guidance(dialect.family()),
        None => GENERIC_GUIDANCE,
    }
}

const OUTPUT_CONTRACT: &str = r#"**Your Output Must Be Concise and Follow This Exact Format:**

### Summary
A one-sentence overview of the primary issue and the proposed fix.

### Identified Issues
A **concise** bulleted list of specific problems found.

### Optimized Code/Query
The rewritten, optimized version of the code or a description of the optimal access pattern. If providing code, use a markdown code block.

### Explanation of Changes
A **concise**, bulleted list explaining *why* each change improves performance. **You must wrap all SQL keywords, table/column names, and code identifiers in backticks (`)**. For example: "The `JOIN` was changed to use the indexed `user_id` column."

Provide your entire response in GitHub-flavored Markdown. Be direct and to the point."#;

pub fn build_prompt(query_text: &str, dialect_id: &str) -> String {
    let system = system_name(dialect_id);
    let guidance = guidance_for(dialect_id);
    let fence = fence_for(query_text);

    format!(
        "You are an expert Senior Database Administrator and Architect. Your task is to provide a concise, \
actionable optimization review for the following {system} query or code.

---
**Core Task:**
Analyze the provided code for performance bottlenecks, anti-patterns, and platform-specific optimizations.

---
**Guidance for {system}:**
{guidance}

---
{OUTPUT_CONTRACT}

Here is the code to optimize for {system}:
{fence}
{query_text}
{fence}
"
    )
}

fn system_name(dialect_id: &str) -> String {
    match Dialect::parse(dialect_id) {
        Some(dialect) => dialect.label().to_string(),
        None => {
            let raw = dialect_id.trim();
            if raw.is_empty() {
                "SQL".to_string()
            } else {
                raw.to_string()
            }
        }
    }
}

/// A backtick fence longer than any backtick run inside the query.
fn fence_for(query_text: &str) -> String {
    let mut longest = 0;
    let mut current = 0;
    for ch in query_text.chars() {
        if ch == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}
