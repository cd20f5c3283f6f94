use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

use adg_core::{DetectorConfig, ProjectIr};

use crate::archetype::Archetype;

/// Module identifiers and class names that smell like a persistence layer.
const PERSISTENCE_KEYWORDS: &[&str] = &[
    "model",
    "entity",
    "database",
    "table",
    "schema",
    "migration",
    "orm",
    "sql",
    "repository",
];

/// Path fragments that mark request/response style code.
const SERVICE_KEYWORDS: &[&str] = &[
    "api",
    "service",
    "controller",
    "handler",
    "endpoint",
    "route",
    "client",
];

/// Import targets that indicate remote calls worth a sequence diagram.
const HTTP_MODULES: &[&str] = &["http", "requests", "axios", "fetch", "reqwest", "grpc", "rpc"];

/// One ranked suggestion: which diagram to generate, how strongly the
/// aggregate IR supports it, and which files drove the signals. Always
/// recomputable from the IR; never treated as a source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramRecommendation {
    pub archetype: Archetype,
    pub score: f64,
    pub reasons: Vec<String>,
    pub contributing_files: Vec<PathBuf>,
}

/// Scores diagram archetypes against an aggregate IR.
///
/// Every trigger is a non-decreasing function of some entity count, so
/// adding entities to the aggregate can only raise (never lower) a score.
/// Raw trigger sums are clipped to `max_score`, then multiplied by the
/// configured per-archetype weight.
pub struct DiagramDetector {
    config: DetectorConfig,
}

impl DiagramDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn detect(&self, project: &ProjectIr) -> Vec<DiagramRecommendation> {
        if project.is_empty() {
            return Vec::new();
        }

        let signals = ProjectSignals::collect(project);
        let mut recommendations = Vec::new();

        for archetype in Archetype::ALL {
            let scored = match archetype {
                Archetype::ClassDiagram => self.score_class_diagram(&signals),
                Archetype::ErDiagram => self.score_er_diagram(&signals),
                Archetype::SequenceDiagram => self.score_sequence_diagram(&signals),
                Archetype::Flowchart => self.score_flowchart(&signals),
                Archetype::ComponentDiagram => self.score_component_diagram(&signals),
            };

            let raw: f64 = scored.triggers.iter().map(|t| t.weight).sum();
            if raw <= 0.0 {
                continue;
            }
            let clipped = raw.min(self.config.max_score);
            let weighted = clipped * self.config.weight_for(archetype.as_str());
            debug!(
                "archetype {} raw={} clipped={} weighted={}",
                archetype, raw, clipped, weighted
            );
            if weighted <= self.config.min_score {
                continue;
            }

            recommendations.push(DiagramRecommendation {
                archetype,
                score: weighted,
                reasons: scored.triggers.into_iter().map(|t| t.reason).collect(),
                contributing_files: scored.files,
            });
        }

        // Stable sort: equal scores keep declaration order.
        recommendations.sort_by(|a, b| b.score.total_cmp(&a.score));
        recommendations
    }

    fn score_class_diagram(&self, s: &ProjectSignals) -> ScoredArchetype {
        let mut out = ScoredArchetype::new(s.class_files.clone());
        if s.class_count >= 1 {
            out.trigger(25.0, format!("{} class-like definitions", s.class_count));
        }
        if s.class_count >= 2 {
            out.trigger(20.0, "multiple classes to relate".to_string());
        }
        if s.class_count >= 5 {
            out.trigger(25.0, "rich class structure".to_string());
        }
        if s.classes_with_bases >= 1 {
            out.trigger(
                15.0,
                format!("{} classes declare base types", s.classes_with_bases),
            );
        }
        if s.decorated_classes >= 1 {
            out.trigger(
                10.0,
                format!("{} classes carry decorators or annotations", s.decorated_classes),
            );
        }
        out
    }

    fn score_er_diagram(&self, s: &ProjectSignals) -> ScoredArchetype {
        let mut out = ScoredArchetype::new(s.persistence_files.clone());
        if s.persistence_import_count >= 1 {
            out.trigger(
                30.0,
                format!(
                    "persistence-related imports ({})",
                    sample_list(&s.persistence_import_modules)
                ),
            );
        }
        if s.persistence_import_count >= 3 {
            out.trigger(15.0, "several persistence imports".to_string());
        }
        if s.persistence_class_count >= 1 {
            out.trigger(
                25.0,
                format!(
                    "entity-style class names ({})",
                    sample_list(&s.persistence_class_names)
                ),
            );
        }
        if s.persistence_class_count >= 3 {
            out.trigger(15.0, "several entity-style classes".to_string());
        }
        if s.persistence_path_count >= 1 {
            out.trigger(
                10.0,
                format!("{} file paths mention persistence", s.persistence_path_count),
            );
        }
        out
    }

    fn score_sequence_diagram(&self, s: &ProjectSignals) -> ScoredArchetype {
        let mut out = ScoredArchetype::new(s.sequence_files.clone());
        if s.async_fn_count >= 1 {
            out.trigger(20.0, format!("{} async functions", s.async_fn_count));
        }
        if s.async_fn_count >= 3 {
            out.trigger(20.0, "async-heavy call flow".to_string());
        }
        if s.service_file_count >= 1 {
            out.trigger(
                20.0,
                format!("{} service-oriented file paths", s.service_file_count),
            );
        }
        if s.functions_in_service_files >= 5 {
            out.trigger(
                15.0,
                format!(
                    "{} functions inside service-oriented files",
                    s.functions_in_service_files
                ),
            );
        }
        if s.http_import_count >= 1 {
            out.trigger(15.0, "imports of http/rpc modules".to_string());
        }
        out
    }

    fn score_flowchart(&self, s: &ProjectSignals) -> ScoredArchetype {
        let mut out = ScoredArchetype::new(s.function_files.clone());
        if s.function_count >= 3 {
            out.trigger(20.0, format!("{} functions defined", s.function_count));
        }
        if s.function_count >= 10 {
            out.trigger(25.0, "many functions to chart".to_string());
        }
        if s.max_param_count >= 4 {
            out.trigger(
                10.0,
                format!("functions with up to {} parameters", s.max_param_count),
            );
        }
        if s.files_with_functions >= 2 {
            out.trigger(
                15.0,
                format!("functions spread over {} files", s.files_with_functions),
            );
        }
        out
    }

    fn score_component_diagram(&self, s: &ProjectSignals) -> ScoredArchetype {
        let mut out = ScoredArchetype::new(s.import_files.clone());
        if s.distinct_import_targets >= 5 {
            out.trigger(
                25.0,
                format!("{} distinct import targets", s.distinct_import_targets),
            );
        }
        if s.distinct_import_targets >= 10 {
            out.trigger(25.0, "wide dependency surface".to_string());
        }
        if s.files_with_imports >= 3 {
            out.trigger(
                20.0,
                format!("imports spread over {} files", s.files_with_imports),
            );
        }
        if s.language_count >= 2 {
            out.trigger(10.0, format!("project spans {} languages", s.language_count));
        }
        out
    }
}

struct Trigger {
    weight: f64,
    reason: String,
}

struct ScoredArchetype {
    triggers: Vec<Trigger>,
    files: Vec<PathBuf>,
}

impl ScoredArchetype {
    fn new(files: Vec<PathBuf>) -> Self {
        Self {
            triggers: Vec::new(),
            files,
        }
    }

    fn trigger(&mut self, weight: f64, reason: String) {
        self.triggers.push(Trigger { weight, reason });
    }
}

/// Counts derived once from the aggregate, in aggregation order. All fields
/// are plain tallies so every trigger predicate stays monotonic.
struct ProjectSignals {
    class_count: usize,
    classes_with_bases: usize,
    decorated_classes: usize,
    class_files: Vec<PathBuf>,

    persistence_import_count: usize,
    persistence_import_modules: Vec<String>,
    persistence_class_count: usize,
    persistence_class_names: Vec<String>,
    persistence_path_count: usize,
    persistence_files: Vec<PathBuf>,

    async_fn_count: usize,
    service_file_count: usize,
    functions_in_service_files: usize,
    http_import_count: usize,
    sequence_files: Vec<PathBuf>,

    function_count: usize,
    files_with_functions: usize,
    max_param_count: usize,
    function_files: Vec<PathBuf>,

    distinct_import_targets: usize,
    files_with_imports: usize,
    language_count: usize,
    import_files: Vec<PathBuf>,
}

impl ProjectSignals {
    fn collect(project: &ProjectIr) -> Self {
        let mut class_files = Vec::new();
        let mut persistence_files = Vec::new();
        let mut sequence_files = Vec::new();
        let mut function_files = Vec::new();
        let mut import_files = Vec::new();

        let mut classes_with_bases = 0;
        let mut decorated_classes = 0;
        let mut persistence_import_count = 0;
        let mut persistence_import_modules = Vec::new();
        let mut persistence_class_count = 0;
        let mut persistence_class_names = Vec::new();
        let mut persistence_path_count = 0;
        let mut async_fn_count = 0;
        let mut service_file_count = 0;
        let mut functions_in_service_files = 0;
        let mut http_import_count = 0;
        let mut files_with_functions = 0;
        let mut max_param_count = 0;
        let mut files_with_imports = 0;
        let mut import_targets = HashSet::new();

        for file in &project.files {
            let path_lower = file.path.to_string_lossy().to_lowercase();
            let service_path = contains_any(&path_lower, SERVICE_KEYWORDS);
            let persistence_path = contains_any(&path_lower, PERSISTENCE_KEYWORDS);

            if !file.classes.is_empty() {
                class_files.push(file.path.clone());
            }
            if !file.functions.is_empty() {
                files_with_functions += 1;
                function_files.push(file.path.clone());
            }
            if !file.imports.is_empty() {
                files_with_imports += 1;
                import_files.push(file.path.clone());
            }
            if service_path {
                service_file_count += 1;
                functions_in_service_files += file.functions.len();
                sequence_files.push(file.path.clone());
            }
            if persistence_path {
                persistence_path_count += 1;
                persistence_files.push(file.path.clone());
            }

            for class in &file.classes {
                if !class.bases.is_empty() {
                    classes_with_bases += 1;
                }
                if !class.decorators.is_empty() {
                    decorated_classes += 1;
                }
                if contains_any(&class.name.to_lowercase(), PERSISTENCE_KEYWORDS) {
                    persistence_class_count += 1;
                    persistence_class_names.push(class.name.clone());
                    persistence_files.push(file.path.clone());
                }
            }

            let mut file_has_async = false;
            for function in &file.functions {
                if function.is_async {
                    async_fn_count += 1;
                    file_has_async = true;
                }
                max_param_count = max_param_count.max(function.params.len());
            }
            if file_has_async {
                sequence_files.push(file.path.clone());
            }

            for import in &file.imports {
                let module_lower = import.module.to_lowercase();
                import_targets.insert(import.module.clone());
                if contains_any(&module_lower, PERSISTENCE_KEYWORDS) {
                    persistence_import_count += 1;
                    persistence_import_modules.push(import.module.clone());
                    persistence_files.push(file.path.clone());
                }
                if contains_any(&module_lower, HTTP_MODULES) {
                    http_import_count += 1;
                    sequence_files.push(file.path.clone());
                }
            }
        }

        Self {
            class_count: project.total_classes(),
            classes_with_bases,
            decorated_classes,
            class_files: dedup_paths(class_files),
            persistence_import_count,
            persistence_import_modules,
            persistence_class_count,
            persistence_class_names,
            persistence_path_count,
            persistence_files: dedup_paths(persistence_files),
            async_fn_count,
            service_file_count,
            functions_in_service_files,
            http_import_count,
            sequence_files: dedup_paths(sequence_files),
            function_count: project.total_functions(),
            files_with_functions,
            max_param_count,
            function_files: dedup_paths(function_files),
            distinct_import_targets: import_targets.len(),
            files_with_imports,
            language_count: project.languages().len(),
            import_files: dedup_paths(import_files),
        }
    }
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}

fn dedup_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths.into_iter().filter(|p| seen.insert(p.clone())).collect()
}

/// First few items, for reason strings that should stay readable.
fn sample_list(items: &[String]) -> String {
    const SHOWN: usize = 3;
    if items.len() <= SHOWN {
        items.join(", ")
    } else {
        format!("{}, …", items[..SHOWN].join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adg_core::{ClassEntity, FileIr, FunctionEntity, ImportEdge, Language};

    fn detector() -> DiagramDetector {
        DiagramDetector::new(DetectorConfig::default())
    }

    fn file_with_classes(path: &str, names: &[&str]) -> FileIr {
        let mut ir = FileIr::new(path, Language::Python);
        for (i, name) in names.iter().enumerate() {
            ir.classes
                .push(ClassEntity::new(*name, path, (i as u32 + 1) * 10));
        }
        ir
    }

    #[test]
    fn empty_aggregate_yields_empty_list() {
        let project = ProjectIr::new();
        assert!(detector().detect(&project).is_empty());

        // Files that produced no entities count as empty too.
        let mut project = ProjectIr::new();
        project.push(FileIr::new("src/empty.py", Language::Python));
        assert!(detector().detect(&project).is_empty());
    }

    #[test]
    fn class_heavy_project_ranks_class_diagram_first() {
        let mut project = ProjectIr::new();
        project.push(file_with_classes("src/alpha.py", &["Alpha", "Beta"]));
        project.push(file_with_classes("src/beta.py", &["Gamma", "Delta", "Epsilon"]));

        let recs = detector().detect(&project);
        assert_eq!(recs[0].archetype, Archetype::ClassDiagram);
        assert!(recs[0].score > 0.0);
        assert!(recs[0].reasons.iter().any(|r| r.contains("5 class-like")));
        assert_eq!(recs[0].contributing_files.len(), 2);
    }

    #[test]
    fn adding_a_class_never_lowers_class_diagram_score() {
        let mut project = ProjectIr::new();
        project.push(file_with_classes("src/alpha.py", &["Alpha"]));

        let mut grown = project.clone();
        grown.files[0]
            .classes
            .push(ClassEntity::new("Extra", "src/alpha.py", 99));

        let score = |p: &ProjectIr| {
            detector()
                .detect(p)
                .into_iter()
                .find(|r| r.archetype == Archetype::ClassDiagram)
                .map(|r| r.score)
                .unwrap_or(0.0)
        };
        assert!(score(&grown) >= score(&project));

        // Keep growing; the score stays non-decreasing at every step.
        let mut previous = score(&grown);
        for i in 0..8 {
            grown.files[0]
                .classes
                .push(ClassEntity::new(format!("C{}", i), "src/alpha.py", 100 + i));
            let current = score(&grown);
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn persistence_signals_raise_er_diagram() {
        let mut project = ProjectIr::new();
        let mut ir = FileIr::new("src/models.py", Language::Python);
        ir.classes
            .push(ClassEntity::new("UserModel", "src/models.py", 3));
        ir.imports
            .push(ImportEdge::new("src/models.py", "sqlalchemy"));
        project.push(ir);

        let recs = detector().detect(&project);
        let er = recs
            .iter()
            .find(|r| r.archetype == Archetype::ErDiagram)
            .unwrap();
        // Import (30) + class name (25) + path mentions "model" (10).
        assert_eq!(er.score, 65.0);
        assert!(er.reasons.iter().any(|r| r.contains("sqlalchemy")));
    }

    #[test]
    fn async_and_service_paths_raise_sequence_diagram() {
        let mut project = ProjectIr::new();
        let mut ir = FileIr::new("src/api/handlers.py", Language::Python);
        for i in 0..3 {
            ir.functions.push(
                FunctionEntity::new(format!("handle_{}", i), "src/api/handlers.py", i * 5 + 1)
                    .with_async(true),
            );
        }
        project.push(ir);

        let recs = detector().detect(&project);
        let seq = recs
            .iter()
            .find(|r| r.archetype == Archetype::SequenceDiagram)
            .unwrap();
        // async >=1 (20) + async >=3 (20) + service path (20).
        assert_eq!(seq.score, 60.0);
    }

    #[test]
    fn raw_scores_clip_at_max_before_weighting() {
        let mut config = DetectorConfig::default();
        config.max_score = 50.0;
        config.archetype_weights.insert("classDiagram".into(), 2.0);
        let detector = DiagramDetector::new(config);

        let mut project = ProjectIr::new();
        project.push(file_with_classes(
            "src/a.py",
            &["A", "B", "C", "D", "E", "F"],
        ));
        let recs = detector.detect(&project);
        let class = recs
            .iter()
            .find(|r| r.archetype == Archetype::ClassDiagram)
            .unwrap();
        // Raw 70 clips to 50, then doubles.
        assert_eq!(class.score, 100.0);
    }

    #[test]
    fn zero_weight_drops_an_archetype() {
        let mut config = DetectorConfig::default();
        config.archetype_weights.insert("classDiagram".into(), 0.0);
        let detector = DiagramDetector::new(config);

        let mut project = ProjectIr::new();
        project.push(file_with_classes("src/a.py", &["A", "B"]));
        let recs = detector.detect(&project);
        assert!(recs
            .iter()
            .all(|r| r.archetype != Archetype::ClassDiagram));
    }

    #[test]
    fn ties_break_by_declaration_order() {
        let mut config = DetectorConfig::default();
        // Force identical weighted scores for two archetypes.
        config.max_score = 20.0;
        let detector = DiagramDetector::new(config);

        let mut project = ProjectIr::new();
        let mut ir = FileIr::new("src/work.py", Language::Python);
        ir.classes.push(ClassEntity::new("Widget", "src/work.py", 1));
        for i in 0..3 {
            ir.functions
                .push(FunctionEntity::new(format!("f{}", i), "src/work.py", 10 + i));
        }
        project.push(ir);

        let recs = detector.detect(&project);
        // Both clip to 20.0; classDiagram declares first.
        assert_eq!(recs[0].score, recs[1].score);
        assert!(recs[0].archetype.rank() < recs[1].archetype.rank());
        assert_eq!(recs[0].archetype, Archetype::ClassDiagram);
    }

    #[test]
    fn aggregation_order_does_not_change_scores() {
        let files = vec![
            file_with_classes("src/a.py", &["A"]),
            file_with_classes("src/b.py", &["B", "C"]),
            file_with_classes("src/api/c.py", &["D"]),
        ];

        let mut forward = ProjectIr::new();
        for f in files.clone() {
            forward.push(f);
        }
        let mut reversed = ProjectIr::new();
        for f in files.into_iter().rev() {
            reversed.push(f);
        }

        let a = detector().detect(&forward);
        let b = detector().detect(&reversed);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.archetype, y.archetype);
            assert_eq!(x.score, y.score);
        }
    }

    #[test]
    fn recommendations_serialize_for_downstream_consumers() {
        let mut project = ProjectIr::new();
        project.push(file_with_classes("src/a.py", &["A"]));
        let recs = detector().detect(&project);
        let json = serde_json::to_string(&recs).unwrap();
        assert!(json.contains("classDiagram"));
        assert!(json.contains("score"));
    }
}
