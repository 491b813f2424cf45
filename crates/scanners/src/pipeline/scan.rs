//! Scan orchestrator: six ordered phases over one repository.
//!
//! All accumulator mutation happens here, on the orchestrating task.
//! Workers (detector evaluation, model calls) return values; unit failures
//! are logged and excluded; only enumeration-level trouble is fatal.

use crate::core::{sort_canonical, CoreFinding, CoreScanResult, Correlator, FindingKind, Location, ScanStats};
use crate::detect::SignalDetector;
use crate::error::ScanError;
use crate::knowledge::KnowledgeBase;
use crate::llm::schemas::{parse_map_response, parse_pass_response};
use crate::llm::{LlmClient, LlmError, PromptKind, RawModelOutput, RiskLevel};
use crate::pipeline::chunk::{build_schema_context, chunk_files, prioritize, Chunk, PrioritizedChunk};
use crate::pipeline::{
    CancelFlag, PipelineConfig, ProgressSink, Repository, ScanPhase, ScanProgressEvent, SourceFile,
};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub struct ScanPipeline {
    detectors: Vec<Arc<dyn SignalDetector>>,
    client: Arc<dyn LlmClient>,
    knowledge: KnowledgeBase,
    config: PipelineConfig,
}

impl ScanPipeline {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            detectors: crate::detect::default_detectors(),
            client,
            knowledge: KnowledgeBase::builtin(),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_detectors(mut self, detectors: Vec<Arc<dyn SignalDetector>>) -> Self {
        self.detectors = detectors;
        self
    }

    pub fn with_knowledge(mut self, knowledge: KnowledgeBase) -> Self {
        self.knowledge = knowledge;
        self
    }

    /// Run all six phases. The returned result is immutable; the pipeline
    /// retains nothing of it.
    pub async fn run(
        &self,
        repo: &dyn Repository,
        progress: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<CoreScanResult, ScanError> {
        self.validate_config()?;

        let start = Instant::now();
        let knowledge_context = self.knowledge.build_context();

        let mut findings: Vec<CoreFinding> = Vec::new();
        let mut failed_chunks: BTreeSet<String> = BTreeSet::new();

        // Phase 1: static_scanners.
        self.check_cancel(cancel, ScanPhase::StaticScanners)?;
        let files = repo
            .list_files()
            .map_err(|e| ScanError::fatal(ScanPhase::StaticScanners, e))?;
        let static_findings = self.run_static_phase(&files, progress);
        let scanned_files = files.len();
        findings.extend(static_findings);

        // Phase 2: llm_map.
        self.check_cancel(cancel, ScanPhase::LlmMap)?;
        let chunks = chunk_files(&files, self.config.chunk_max_lines);
        let prioritized = self
            .run_map_phase(&chunks, &knowledge_context, progress, cancel, &mut failed_chunks)
            .await?;

        // Phase 3: llm_rule.
        self.check_cancel(cancel, ScanPhase::LlmRule)?;
        let rule_context = match (self.config.schema_introspection, build_schema_context(&files)) {
            (true, Some(schema)) => format!("{knowledge_context}\n\n{schema}"),
            _ => knowledge_context.clone(),
        };
        let rule_findings = self
            .run_chunk_pass(
                ScanPhase::LlmRule,
                PromptKind::Rule,
                &prioritized,
                &rule_context,
                progress,
                cancel,
                &mut failed_chunks,
            )
            .await?;
        findings.extend(rule_findings);

        // Phase 4: llm_open.
        self.check_cancel(cancel, ScanPhase::LlmOpen)?;
        let open_findings = self
            .run_chunk_pass(
                ScanPhase::LlmOpen,
                PromptKind::Open,
                &prioritized,
                &knowledge_context,
                progress,
                cancel,
                &mut failed_chunks,
            )
            .await?;
        findings.extend(open_findings);

        // Phase 5: llm_composite.
        self.check_cancel(cancel, ScanPhase::LlmComposite)?;
        let composite_seeds = self
            .run_composite_phase(&findings, &knowledge_context, progress)
            .await;
        findings.extend(composite_seeds);

        // Phase 6: postprocess.
        self.check_cancel(cancel, ScanPhase::Postprocess)?;
        self.emit(progress, ScanPhase::Postprocess, 0, 1, Some("correlating findings"));
        let correlator = Correlator::new(self.config.correlator);
        let composite_findings = correlator.correlate(&findings);
        self.emit(progress, ScanPhase::Postprocess, 1, 1, None);

        let stats = ScanStats {
            scanned_files,
            scanned_chunks: chunks.len() - failed_chunks.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            findings = findings.len(),
            composite = composite_findings.len(),
            scanned_files = stats.scanned_files,
            scanned_chunks = stats.scanned_chunks,
            "scan complete"
        );

        Ok(CoreScanResult {
            findings,
            composite_findings,
            stats,
        })
    }

    fn validate_config(&self) -> Result<(), ScanError> {
        if self.config.max_concurrent_requests == 0 {
            return Err(ScanError::Config(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.config.retry_attempts == 0 {
            return Err(ScanError::Config(
                "retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.detectors.is_empty() {
            return Err(ScanError::Config("no signal detectors registered".to_string()));
        }
        Ok(())
    }

    fn check_cancel(&self, cancel: &CancelFlag, phase: ScanPhase) -> Result<(), ScanError> {
        if cancel.is_cancelled() {
            Err(ScanError::Cancelled { phase })
        } else {
            Ok(())
        }
    }

    fn emit(
        &self,
        progress: &dyn ProgressSink,
        phase: ScanPhase,
        current: usize,
        total: usize,
        message: Option<&str>,
    ) {
        progress.on_event(ScanProgressEvent {
            phase,
            current,
            total,
            message: message.map(str::to_string),
        });
    }

    /// Every registered detector over every file, data-parallel. Results
    /// are buffered and sorted before they join the accumulator, never
    /// appended in completion order.
    fn run_static_phase(&self, files: &[SourceFile], progress: &dyn ProgressSink) -> Vec<CoreFinding> {
        let phase = ScanPhase::StaticScanners;
        self.emit(progress, phase, 0, files.len(), Some("running signal detectors"));

        let mut per_file: Vec<(usize, Vec<CoreFinding>)> = files
            .par_iter()
            .enumerate()
            .map(|(i, file)| (i, self.detect_file(file)))
            .collect();
        per_file.sort_by_key(|(i, _)| *i);

        let mut findings = Vec::new();
        for (i, file_findings) in per_file {
            findings.extend(file_findings);
            self.emit(progress, phase, i + 1, files.len(), None);
        }
        self.emit(progress, phase, files.len(), files.len(), Some("signal detectors done"));

        findings
    }

    fn detect_file(&self, file: &SourceFile) -> Vec<CoreFinding> {
        let mut findings = Vec::new();

        for detector in &self.detectors {
            if let Some(evidence) = detector.detect(&file.content) {
                debug!(file = %file.path, detector = detector.id(), "evidence matched");
                findings.push(
                    CoreFinding::new(
                        FindingKind::Static,
                        detector.id(),
                        detector.severity(),
                        format!("{} evidence in {}", detector.category(), file.path),
                    )
                    .with_category(detector.category())
                    .with_location(Location::file(&file.path).with_line(evidence.line))
                    .with_detail("evidence", evidence.text),
                );
            }
        }

        findings
    }

    /// Triage every chunk; a failed map call leaves the chunk at the
    /// default priority and excludes it from the scanned count.
    async fn run_map_phase(
        &self,
        chunks: &[Chunk],
        context: &str,
        progress: &dyn ProgressSink,
        cancel: &CancelFlag,
        failed_chunks: &mut BTreeSet<String>,
    ) -> Result<Vec<PrioritizedChunk>, ScanError> {
        let phase = ScanPhase::LlmMap;
        self.emit(progress, phase, 0, chunks.len(), Some("triaging chunks"));

        let outputs = self
            .run_units(phase, PromptKind::Map, chunks, context, progress, cancel)
            .await?;

        let mut prioritized = Vec::with_capacity(chunks.len());
        for (chunk, output) in chunks.iter().zip(outputs) {
            let risk = match output.and_then(|o| parse_map_response(&o.content)) {
                Ok(map) => map.risk,
                Err(e) => {
                    warn!(chunk = %chunk.id(), error = %e, "map pass failed, using default priority");
                    failed_chunks.insert(chunk.id());
                    RiskLevel::default()
                }
            };
            prioritized.push(PrioritizedChunk {
                chunk: chunk.clone(),
                risk,
            });
        }

        self.emit(progress, phase, chunks.len(), chunks.len(), Some("triage done"));
        Ok(prioritize(prioritized))
    }

    /// One model pass per chunk in priority order. Unit failures are
    /// excluded from the phase output and the scanned-chunk count.
    #[allow(clippy::too_many_arguments)]
    async fn run_chunk_pass(
        &self,
        phase: ScanPhase,
        kind: PromptKind,
        prioritized: &[PrioritizedChunk],
        context: &str,
        progress: &dyn ProgressSink,
        cancel: &CancelFlag,
        failed_chunks: &mut BTreeSet<String>,
    ) -> Result<Vec<CoreFinding>, ScanError> {
        self.emit(progress, phase, 0, prioritized.len(), Some("analyzing chunks"));

        let chunks: Vec<Chunk> = prioritized.iter().map(|p| p.chunk.clone()).collect();
        let outputs = self
            .run_units(phase, kind, &chunks, context, progress, cancel)
            .await?;

        let source = phase.as_str();
        let mut findings = Vec::new();

        for (chunk, output) in chunks.iter().zip(outputs) {
            match output.and_then(|o| parse_pass_response(&o.content)) {
                Ok(response) => {
                    for model_finding in response.findings {
                        findings.push(model_finding.into_core(
                            FindingKind::Repository,
                            source,
                            Some(&chunk.file),
                        ));
                    }
                }
                Err(e) => {
                    warn!(chunk = %chunk.id(), pass = kind.as_str(), error = %e, "chunk pass failed, excluding unit");
                    failed_chunks.insert(chunk.id());
                }
            }
        }

        // Canonical order before the next phase: the downstream must never
        // see completion order.
        sort_canonical(&mut findings);
        self.emit(progress, phase, chunks.len(), chunks.len(), Some("pass done"));
        Ok(findings)
    }

    /// Single re-examination pass over the accumulated findings. Gated by
    /// the composite feature flag; a call failure costs only this phase's
    /// contribution.
    async fn run_composite_phase(
        &self,
        findings: &[CoreFinding],
        context: &str,
        progress: &dyn ProgressSink,
    ) -> Vec<CoreFinding> {
        let phase = ScanPhase::LlmComposite;

        if !self.config.enable_composite || findings.is_empty() {
            let reason = if self.config.enable_composite {
                "nothing to correlate"
            } else {
                "composite pass disabled"
            };
            self.emit(progress, phase, 0, 0, Some(reason));
            self.emit(progress, phase, 0, 0, None);
            return Vec::new();
        }

        self.emit(progress, phase, 0, 1, Some("correlating across files"));

        let digest = build_finding_digest(findings);
        let result = self
            .call_with_retry(PromptKind::Composite, &digest, context)
            .await
            .and_then(|o| parse_pass_response(&o.content));

        let seeds = match result {
            Ok(response) => {
                let mut seeds: Vec<CoreFinding> = response
                    .findings
                    .into_iter()
                    .map(|f| f.into_core(FindingKind::RepositoryComposite, phase.as_str(), None))
                    .collect();
                sort_canonical(&mut seeds);
                seeds
            }
            Err(e) => {
                warn!(error = %e, "composite pass failed, excluding its contribution");
                Vec::new()
            }
        };

        self.emit(progress, phase, 1, 1, None);
        seeds
    }

    /// Issue one model call per chunk, bounded by the configured
    /// concurrency, with per-request timeout and retry. Output order matches
    /// input order regardless of completion order.
    async fn run_units(
        &self,
        phase: ScanPhase,
        kind: PromptKind,
        chunks: &[Chunk],
        context: &str,
        progress: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<Vec<Result<RawModelOutput, LlmError>>, ScanError> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_requests));
        let mut join_set: JoinSet<(usize, Option<Result<RawModelOutput, LlmError>>)> = JoinSet::new();

        for (index, chunk) in chunks.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let client = Arc::clone(&self.client);
            let cancel = cancel.clone();
            let content = chunk.render();
            let context = context.to_string();
            let timeout = self.config.request_timeout();
            let attempts = self.config.retry_attempts;

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore open");
                if cancel.is_cancelled() {
                    return (index, None);
                }
                let result =
                    call_with_retry_inner(client.as_ref(), kind, &content, &context, timeout, attempts)
                        .await;
                (index, Some(result))
            });
        }

        let mut outputs: Vec<Option<Result<RawModelOutput, LlmError>>> =
            (0..chunks.len()).map(|_| None).collect();
        let mut completed = 0usize;

        while let Some(joined) = join_set.join_next().await {
            let (index, result) = joined.expect("unit task never panics");
            if let Some(result) = result {
                outputs[index] = Some(result);
                completed += 1;
                self.emit(progress, phase, completed, chunks.len(), None);
            }
        }

        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled { phase });
        }

        Ok(outputs
            .into_iter()
            .map(|o| o.expect("every unit completed"))
            .collect())
    }

    async fn call_with_retry(
        &self,
        kind: PromptKind,
        content: &str,
        context: &str,
    ) -> Result<RawModelOutput, LlmError> {
        call_with_retry_inner(
            self.client.as_ref(),
            kind,
            content,
            context,
            self.config.request_timeout(),
            self.config.retry_attempts,
        )
        .await
    }
}

/// Timeout plus bounded retry around one collaborator call. Only transient
/// errors are retried; a timeout counts as transient.
async fn call_with_retry_inner(
    client: &dyn LlmClient,
    kind: PromptKind,
    content: &str,
    context: &str,
    timeout: std::time::Duration,
    attempts: u32,
) -> Result<RawModelOutput, LlmError> {
    let mut last_error = LlmError::Api("no attempts made".to_string());

    for attempt in 1..=attempts {
        let call = client.run_pass(kind, content, context);
        let result = match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(timeout.as_secs())),
        };

        match result {
            Ok(output) => return Ok(output),
            Err(e) if e.is_retryable() && attempt < attempts => {
                debug!(attempt, error = %e, "retrying transient model error");
                tokio::time::sleep(std::time::Duration::from_millis(100 * attempt as u64)).await;
                last_error = e;
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error)
}

/// Digest of accumulated findings for the composite pass: one line per
/// finding, grouped by file, plus the repository-wide tail.
fn build_finding_digest(findings: &[CoreFinding]) -> String {
    let mut sorted: Vec<&CoreFinding> = findings.iter().collect();
    sorted.sort_by(|a, b| {
        a.file()
            .cmp(&b.file())
            .then_with(|| a.start_line().cmp(&b.start_line()))
    });

    let mut digest = String::new();
    for finding in sorted {
        let location = finding
            .location
            .as_ref()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "repository-wide".to_string());
        digest.push_str(&format!(
            "- [{}] {} ({}, {}) at {}: {}\n",
            finding.severity,
            finding.category.as_deref().unwrap_or("uncategorized"),
            finding.kind,
            finding.source,
            location,
            finding.summary,
        ));
    }
    digest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Severity;

    #[test]
    fn digest_lists_findings_by_file_then_line() {
        let findings = vec![
            CoreFinding::new(FindingKind::Static, "det", Severity::High, "late")
                .with_location(Location::file("src/b.ts").with_line(9)),
            CoreFinding::new(FindingKind::Static, "det", Severity::Low, "early")
                .with_location(Location::file("src/a.ts").with_line(2)),
            CoreFinding::new(FindingKind::Repository, "llm_open", Severity::Medium, "wide"),
        ];

        let digest = build_finding_digest(&findings);
        let wide = digest.find("repository-wide").unwrap();
        let early = digest.find("src/a.ts").unwrap();
        let late = digest.find("src/b.ts").unwrap();
        assert!(wide < early && early < late);
    }
}
