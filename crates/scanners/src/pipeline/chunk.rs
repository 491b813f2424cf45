use crate::llm::RiskLevel;
use crate::pipeline::SourceFile;

/// A bounded slice of one file, sized for a single model pass. Chunk
/// identity is `(file, index)`; line numbers are absolute within the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub file: String,
    pub index: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
}

impl Chunk {
    pub fn id(&self) -> String {
        format!("{}#{}", self.file, self.index)
    }

    /// Content as presented to the model: a header naming file and line
    /// range so reported lines are absolute.
    pub fn render(&self) -> String {
        format!(
            "// file: {} (lines {}-{})\n{}",
            self.file, self.start_line, self.end_line, self.content
        )
    }
}

/// Split every file into line-bounded chunks, in path order.
pub fn chunk_files(files: &[SourceFile], max_lines: usize) -> Vec<Chunk> {
    let max_lines = max_lines.max(1);
    let mut chunks = Vec::new();

    for file in files {
        let lines: Vec<&str> = file.content.lines().collect();
        if lines.is_empty() {
            continue;
        }

        for (index, window) in lines.chunks(max_lines).enumerate() {
            let start_line = index * max_lines + 1;
            chunks.push(Chunk {
                file: file.path.clone(),
                index,
                start_line,
                end_line: start_line + window.len() - 1,
                content: window.join("\n"),
            });
        }
    }

    chunks
}

/// A chunk plus its triage priority from the map pass.
#[derive(Debug, Clone)]
pub struct PrioritizedChunk {
    pub chunk: Chunk,
    pub risk: RiskLevel,
}

/// Order chunks for the deep passes: highest risk first, ties in canonical
/// (file, index) order so the schedule is reproducible.
pub fn prioritize(mut chunks: Vec<PrioritizedChunk>) -> Vec<PrioritizedChunk> {
    chunks.sort_by(|a, b| {
        b.risk
            .cmp(&a.risk)
            .then_with(|| a.chunk.file.cmp(&b.chunk.file))
            .then_with(|| a.chunk.index.cmp(&b.chunk.index))
    });
    chunks
}

/// Schema-introspection sub-source: files that define a backing data schema.
pub fn is_schema_file(path: &str) -> bool {
    let lower = path.to_lowercase();
    lower.ends_with(".sql")
        || lower.ends_with("schema.prisma")
        || lower.contains("migrations/")
        || lower.ends_with("schema.rb")
}

/// Digest of schema-defining files, fed to the rule pass as extra context
/// when the schema-introspection flag is on.
pub fn build_schema_context(files: &[SourceFile]) -> Option<String> {
    let schema_files: Vec<&SourceFile> =
        files.iter().filter(|f| is_schema_file(&f.path)).collect();
    if schema_files.is_empty() {
        return None;
    }

    let mut digest = String::from("Backing data schema:\n");
    for file in schema_files {
        digest.push_str(&format!("--- {}\n{}\n", file.path, file.content.trim()));
    }
    Some(digest)
}
