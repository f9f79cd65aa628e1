//! End-to-end flow: hybrid planning, then the repair loop against in-memory
//! collaborator fakes until the document validates or the cap is hit.

use std::collections::HashMap;

use async_trait::async_trait;

use planner::config::PlannerConfig;
use planner::errors::EngineError;
use planner::external::{
    CandidateInfo, CompanyProfile, JobProfile, Proposer, RenderOutput, Renderer, RendererConfig,
    Rewriter, Validator,
};
use planner::models::content::{
    ContentUnit, RankedStory, RewrittenBullet, RewrittenSet, SkillTarget, SpaceBudget, Story,
};
use planner::models::plan::Plan;
use planner::models::violation::{
    attribute_with_line_map, LineMap, LineRef, Severity, Violation, ViolationKind,
};
use planner::models::RepairAction;
use planner::repair::repair_loop::{run_repair_loop, RepairEnv, RepairState};
use planner::scoring::compute_style_flags;
use planner::select_plan_sync;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("planner=debug")
        .with_test_writer()
        .try_init();
}

// ────────────────────────────────────────────────────────────────────────────
// Collaborator fakes
// ────────────────────────────────────────────────────────────────────────────

/// Drops the first bullet each attributed violation points at.
struct AttributionProposer;

#[async_trait]
impl Proposer for AttributionProposer {
    async fn propose(
        &self,
        violations: &[Violation],
        plan: &Plan,
        _rewritten: &RewrittenSet,
        _ranked: &[RankedStory],
        _job: &JobProfile,
        _company: &CompanyProfile,
    ) -> anyhow::Result<Vec<RepairAction>> {
        let mut actions = Vec::new();
        for violation in violations {
            if let Some(unit_id) = &violation.unit_id {
                if plan.contains_unit(unit_id) {
                    actions.push(RepairAction::DropBullet {
                        bullet_id: unit_id.clone(),
                        reason: format!("violation: {}", violation.detail),
                    });
                }
            }
            if actions.len() == 3 {
                break;
            }
        }
        Ok(actions)
    }
}

/// Rewrites from pool text, honoring shorten targets on the selective path.
struct TruncatingRewriter {
    job_target_max: usize,
}

#[async_trait]
impl Rewriter for TruncatingRewriter {
    async fn rewrite(
        &self,
        units: &[ContentUnit],
        _job: &JobProfile,
        _company: &CompanyProfile,
    ) -> anyhow::Result<RewrittenSet> {
        Ok(units
            .iter()
            .map(|u| {
                (
                    u.id.clone(),
                    RewrittenBullet {
                        unit_id: u.id.clone(),
                        text: u.text.clone(),
                        char_len: u.char_len,
                        estimated_lines: u.estimated_lines,
                        style: compute_style_flags(&u.text, self.job_target_max, &[]),
                        target_chars: None,
                    },
                )
            })
            .collect())
    }

    async fn rewrite_selective(
        &self,
        current: &RewrittenSet,
        ids: &[String],
        _job: &JobProfile,
        _company: &CompanyProfile,
    ) -> anyhow::Result<RewrittenSet> {
        let mut next = current.clone();
        for id in ids {
            if let Some(bullet) = next.get_mut(id) {
                if let Some(target) = bullet.target_chars {
                    bullet.text.truncate(target);
                    bullet.char_len = bullet.text.chars().count();
                    bullet.estimated_lines = 1;
                }
            }
        }
        Ok(next)
    }
}

/// One printed line per bullet, with a full line map.
struct PlainRenderer;

#[async_trait]
impl Renderer for PlainRenderer {
    async fn render(
        &self,
        plan: &Plan,
        rewritten: &RewrittenSet,
        _config: &RendererConfig,
        _candidate: &CandidateInfo,
    ) -> anyhow::Result<RenderOutput> {
        let mut document = String::new();
        let mut line_map = LineMap::new();
        let mut line = 1u32;
        for selection in &plan.selections {
            for bullet_id in &selection.bullet_ids {
                if let Some(bullet) = rewritten.get(bullet_id) {
                    document.push_str(&bullet.text);
                    document.push('\n');
                    line_map.insert(
                        line,
                        LineRef {
                            unit_id: bullet_id.clone(),
                            story_id: selection.story_id.clone(),
                        },
                    );
                    line += 1;
                }
            }
        }
        Ok(RenderOutput { document, line_map })
    }
}

/// Checks banned phrases per line and a 10-lines-per-page page budget.
/// Reports line numbers only — attribution is the loop's job.
struct PhrasePageValidator;

const TEST_LINES_PER_PAGE: usize = 10;

#[async_trait]
impl Validator for PhrasePageValidator {
    async fn validate(
        &self,
        document: &str,
        company: &CompanyProfile,
        max_pages: u32,
        max_chars_per_line: u32,
        _line_map: Option<&LineMap>,
    ) -> anyhow::Result<Vec<Violation>> {
        let mut violations = Vec::new();
        let lines: Vec<&str> = document.lines().collect();

        let pages = lines.len().div_ceil(TEST_LINES_PER_PAGE).max(1);
        if pages as u32 > max_pages {
            violations.push(Violation::new(
                ViolationKind::PageOverflow,
                Severity::Error,
                format!("{pages} pages rendered, {max_pages} allowed"),
            ));
        }

        for (i, line) in lines.iter().enumerate() {
            let line_no = (i + 1) as u32;
            if line.chars().count() as u32 > max_chars_per_line {
                violations.push(
                    Violation::new(
                        ViolationKind::LineTooLong,
                        Severity::Error,
                        format!("line {line_no} exceeds {max_chars_per_line} chars"),
                    )
                    .at_line(line_no),
                );
            }
            for phrase in &company.banned_phrases {
                if line.to_lowercase().contains(&phrase.to_lowercase()) {
                    violations.push(
                        Violation::new(
                            ViolationKind::ForbiddenPhrase,
                            Severity::Error,
                            format!("banned phrase '{phrase}' on line {line_no}"),
                        )
                        .at_line(line_no),
                    );
                }
            }
        }
        Ok(violations)
    }
}

/// Always reports the same unattributable violation.
struct StuckValidator;

#[async_trait]
impl Validator for StuckValidator {
    async fn validate(
        &self,
        _document: &str,
        _company: &CompanyProfile,
        _max_pages: u32,
        _max_chars_per_line: u32,
        _line_map: Option<&LineMap>,
    ) -> anyhow::Result<Vec<Violation>> {
        Ok(vec![Violation::new(
            ViolationKind::ForbiddenPhrase,
            Severity::Error,
            "template header contains a banned phrase",
        )])
    }
}

struct BrokenRenderer;

#[async_trait]
impl Renderer for BrokenRenderer {
    async fn render(
        &self,
        _plan: &Plan,
        _rewritten: &RewrittenSet,
        _config: &RendererConfig,
        _candidate: &CandidateInfo,
    ) -> anyhow::Result<RenderOutput> {
        anyhow::bail!("latex compile failed: missing font")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fixtures
// ────────────────────────────────────────────────────────────────────────────

fn make_pool(config: &PlannerConfig) -> Vec<Story> {
    vec![
        Story {
            id: "platform".to_string(),
            role: "Platform Engineer".to_string(),
            company: "Acme".to_string(),
            bullets: vec![
                config.materialize_unit(
                    "plat_1",
                    "platform",
                    "Reduced deploy times by 70% with a Rust-based CI pipeline",
                    vec!["rust".into(), "ci".into()],
                ),
                config.materialize_unit(
                    "plat_2",
                    "platform",
                    "Drove synergy across teams to ship the observability stack",
                    vec!["observability".into()],
                ),
            ],
            metadata: serde_json::json!({"years": 3}),
        },
        Story {
            id: "data".to_string(),
            role: "Data Engineer".to_string(),
            company: "Initech".to_string(),
            bullets: vec![
                config.materialize_unit(
                    "data_1",
                    "data",
                    "Migrated 40TB of batch workloads to Kubernetes",
                    vec!["kubernetes".into()],
                ),
                config.materialize_unit(
                    "data_2",
                    "data",
                    "Built streaming ingestion handling 2M events/sec",
                    vec!["kafka".into(), "aws".into()],
                ),
            ],
            metadata: serde_json::json!({"years": 2}),
        },
    ]
}

fn make_ranked() -> Vec<RankedStory> {
    vec![
        RankedStory {
            story_id: "platform".to_string(),
            relevance: 0.9,
        },
        RankedStory {
            story_id: "data".to_string(),
            relevance: 0.7,
        },
    ]
}

fn make_job() -> JobProfile {
    JobProfile {
        title: "Senior Platform Engineer".to_string(),
        skills: vec![
            SkillTarget {
                name: "rust".to_string(),
                weight: 10.0,
                source: "hard_requirement".to_string(),
            },
            SkillTarget {
                name: "kubernetes".to_string(),
                weight: 8.0,
                source: "jd_keyword".to_string(),
            },
            SkillTarget {
                name: "aws".to_string(),
                weight: 5.0,
                source: "jd_keyword".to_string(),
            },
        ],
        target_max_chars: 180,
    }
}

fn make_company() -> CompanyProfile {
    CompanyProfile {
        name: "Globex".to_string(),
        banned_phrases: vec!["synergy".to_string()],
    }
}

fn make_renderer_config() -> RendererConfig {
    RendererConfig {
        template: "classic".to_string(),
        font_size_pt: 11,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn plan_then_repair_reaches_done() {
    init_tracing();

    let config = PlannerConfig::default();
    let pool = make_pool(&config);
    let ranked = make_ranked();
    let job = make_job();
    let company = make_company();
    let budget = SpaceBudget {
        max_bullets: 6,
        max_lines: 8,
    };

    // Phase 1: plan.
    let plan = select_plan_sync(&ranked, &job, &pool, budget, &config).unwrap();
    assert!(plan.within_budget());
    assert!(plan.unit_ids_unique());
    assert!(plan.contains_unit("plat_1"), "top-weighted rust bullet selected");

    // Phase 2: initial rewrite, render, validate.
    let rewriter = TruncatingRewriter {
        job_target_max: job.target_max_chars,
    };
    let selected_units: Vec<ContentUnit> = pool
        .iter()
        .flat_map(|s| s.bullets.iter())
        .filter(|b| plan.contains_unit(&b.id))
        .cloned()
        .collect();
    let rewritten = rewriter.rewrite(&selected_units, &job, &company).await.unwrap();

    let renderer = PlainRenderer;
    let output = renderer
        .render(&plan, &rewritten, &make_renderer_config(), &CandidateInfo::default())
        .await
        .unwrap();

    let validator = PhrasePageValidator;
    let mut violations = validator
        .validate(&output.document, &company, 1, 100, Some(&output.line_map))
        .await
        .unwrap();
    attribute_with_line_map(&mut violations, &output.line_map);

    // The "synergy" bullet must have been flagged and attributed.
    assert!(violations
        .iter()
        .any(|v| v.kind == ViolationKind::ForbiddenPhrase
            && v.unit_id.as_deref() == Some("plat_2")));

    // Phase 3: repair.
    let proposer = AttributionProposer;
    let env = RepairEnv {
        proposer: &proposer,
        rewriter: &rewriter,
        renderer: &renderer,
        validator: &validator,
        job: &job,
        company: &company,
        pool: &pool,
        ranked_stories: &ranked,
        renderer_config: &make_renderer_config(),
        candidate: &CandidateInfo::default(),
        max_pages: 1,
        max_chars_per_line: 100,
        config: &config,
    };

    let outcome = run_repair_loop(&env, plan, rewritten, output.document, violations)
        .await
        .unwrap();

    assert_eq!(outcome.state, RepairState::Done);
    assert!(outcome.violations.is_empty());
    assert!(outcome.iterations_used >= 1 && outcome.iterations_used <= 5);
    assert!(
        !outcome.document.to_lowercase().contains("synergy"),
        "banned phrase repaired out of the document"
    );
    assert!(outcome.plan.within_budget());
}

#[tokio::test]
async fn unfixable_violation_exhausts_iterations() {
    init_tracing();

    let config = PlannerConfig {
        max_repair_iterations: 3,
        ..PlannerConfig::default()
    };
    let pool = make_pool(&config);
    let ranked = make_ranked();
    let job = make_job();
    let company = make_company();
    let budget = SpaceBudget {
        max_bullets: 6,
        max_lines: 8,
    };

    let plan = select_plan_sync(&ranked, &job, &pool, budget, &config).unwrap();
    let rewriter = TruncatingRewriter {
        job_target_max: job.target_max_chars,
    };
    let selected_units: Vec<ContentUnit> = pool
        .iter()
        .flat_map(|s| s.bullets.iter())
        .filter(|b| plan.contains_unit(&b.id))
        .cloned()
        .collect();
    let rewritten = rewriter.rewrite(&selected_units, &job, &company).await.unwrap();

    let env = RepairEnv {
        proposer: &AttributionProposer,
        rewriter: &rewriter,
        renderer: &PlainRenderer,
        validator: &StuckValidator,
        job: &job,
        company: &company,
        pool: &pool,
        ranked_stories: &ranked,
        renderer_config: &make_renderer_config(),
        candidate: &CandidateInfo::default(),
        max_pages: 1,
        max_chars_per_line: 100,
        config: &config,
    };

    let initial = vec![Violation::new(
        ViolationKind::ForbiddenPhrase,
        Severity::Error,
        "template header contains a banned phrase",
    )];
    let outcome = run_repair_loop(&env, plan, rewritten, String::new(), initial)
        .await
        .unwrap();

    assert_eq!(outcome.state, RepairState::IterationsExhausted);
    assert_eq!(outcome.iterations_used, config.max_repair_iterations);
    assert!(!outcome.violations.is_empty(), "best-effort violations are returned");
}

#[tokio::test]
async fn renderer_failure_aborts_with_phase_and_iteration() {
    init_tracing();

    let config = PlannerConfig::default();
    let pool = make_pool(&config);
    let ranked = make_ranked();
    let job = make_job();
    let company = make_company();
    let budget = SpaceBudget {
        max_bullets: 6,
        max_lines: 8,
    };

    let plan = select_plan_sync(&ranked, &job, &pool, budget, &config).unwrap();
    let rewriter = TruncatingRewriter {
        job_target_max: job.target_max_chars,
    };
    let rewritten: RewrittenSet = HashMap::new();

    let env = RepairEnv {
        proposer: &AttributionProposer,
        rewriter: &rewriter,
        renderer: &BrokenRenderer,
        validator: &PhrasePageValidator,
        job: &job,
        company: &company,
        pool: &pool,
        ranked_stories: &ranked,
        renderer_config: &make_renderer_config(),
        candidate: &CandidateInfo::default(),
        max_pages: 1,
        max_chars_per_line: 100,
        config: &config,
    };

    let initial = vec![Violation::new(
        ViolationKind::PageOverflow,
        Severity::Error,
        "2 pages rendered, 1 allowed",
    )];
    let err = run_repair_loop(&env, plan, rewritten, String::new(), initial)
        .await
        .unwrap_err();

    match err {
        EngineError::ExternalCall { phase, iteration, .. } => {
            assert_eq!(phase, "renderer");
            assert_eq!(iteration, 1);
        }
        other => panic!("expected ExternalCall, got {other:?}"),
    }
}
