// ABOUTME: Java IR collector: classes, interfaces, enums, records, and imports.
// ABOUTME: Annotations are carried as decorator tags on types and methods.

use crate::guard::GuardState;
use adg_core::{ClassEntity, FileIr, FunctionEntity, ImportEdge, Result, SourceFile};
use tree_sitter::{Node, Tree, TreeCursor};

pub struct JavaExtractor;

impl JavaExtractor {
    pub fn extract(tree: &Tree, source: &SourceFile, guard: &mut GuardState) -> Result<FileIr> {
        let mut collector = JavaCollector::new(source);
        let mut cursor = tree.walk();
        collector.walk(&mut cursor, 0, JavaContext::default(), guard)?;
        Ok(collector.into_ir())
    }
}

impl super::IrExtractor for JavaExtractor {
    fn extract(tree: &Tree, source: &SourceFile, guard: &mut GuardState) -> Result<FileIr> {
        JavaExtractor::extract(tree, source, guard)
    }
}

/// Index of the type whose body we are directly inside. Bodies propagate it,
/// everything else clears it, so local classes in method bodies start fresh.
#[derive(Default, Clone)]
struct JavaContext {
    owner_class: Option<usize>,
}

struct JavaCollector<'a> {
    source: &'a SourceFile,
    ir: FileIr,
}

impl<'a> JavaCollector<'a> {
    fn new(source: &'a SourceFile) -> Self {
        Self {
            source,
            ir: FileIr::new(&source.path, source.language),
        }
    }

    fn into_ir(self) -> FileIr {
        self.ir
    }

    fn walk(
        &mut self,
        cursor: &mut TreeCursor,
        depth: u32,
        ctx: JavaContext,
        guard: &mut GuardState,
    ) -> Result<()> {
        guard.enter(depth)?;
        guard.visit()?;
        let node = cursor.node();

        let mut child_ctx = JavaContext::default();
        match node.kind() {
            "class_declaration" => {
                if let Some(idx) = self.record_class(&node) {
                    child_ctx.owner_class = Some(idx);
                }
            }
            "interface_declaration" => {
                if let Some(idx) = self.record_interface(&node) {
                    child_ctx.owner_class = Some(idx);
                }
            }
            "enum_declaration" | "record_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let mut entity = ClassEntity::new(
                        self.node_text(&name_node),
                        &self.source.path,
                        start_line(&node),
                    )
                    .with_decorators(self.annotations(&node));
                    if node.kind() == "record_declaration" {
                        entity.attributes = self.record_components(&node);
                        entity.bases = self.super_interfaces(&node);
                    }
                    self.ir.classes.push(entity);
                    child_ctx.owner_class = Some(self.ir.classes.len() - 1);
                }
            }
            "class_body" | "interface_body" | "enum_body" | "enum_body_declarations" => {
                child_ctx.owner_class = ctx.owner_class;
            }
            "enum_constant" => {
                if let Some(class_idx) = ctx.owner_class {
                    if let Some(name) = node.child_by_field_name("name") {
                        let text = self.node_text(&name);
                        self.ir.classes[class_idx].attributes.push(text);
                    }
                }
            }
            "method_declaration" | "constructor_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = self.node_text(&name_node);
                    if let Some(class_idx) = ctx.owner_class {
                        self.ir.classes[class_idx].methods.push(name.clone());
                    }
                    let mut entity = FunctionEntity::new(name, &self.source.path, start_line(&node))
                        .with_params(self.parameters(&node));
                    entity.return_type = node
                        .child_by_field_name("type")
                        .map(|n| self.node_text(&n));
                    entity.decorators = self.annotations(&node);
                    self.ir.functions.push(entity);
                }
            }
            "field_declaration" | "constant_declaration" => {
                if let Some(class_idx) = ctx.owner_class {
                    for i in 0..node.named_child_count() {
                        if let Some(child) = node.named_child(i) {
                            if child.kind() == "variable_declarator" {
                                if let Some(name) = child.child_by_field_name("name") {
                                    let text = self.node_text(&name);
                                    self.ir.classes[class_idx].attributes.push(text);
                                }
                            }
                        }
                    }
                }
            }
            "import_declaration" => {
                for i in 0..node.named_child_count() {
                    if let Some(child) = node.named_child(i) {
                        if matches!(child.kind(), "scoped_identifier" | "identifier") {
                            let module = self.node_text(&child);
                            self.ir
                                .imports
                                .push(ImportEdge::new(&self.source.path, module));
                            break;
                        }
                    }
                }
            }
            _ => {}
        }

        if cursor.goto_first_child() {
            loop {
                self.walk(cursor, depth + 1, child_ctx.clone(), guard)?;
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
            cursor.goto_parent();
        }
        Ok(())
    }

    fn record_class(&mut self, node: &Node) -> Option<usize> {
        let name_node = node.child_by_field_name("name")?;
        let mut entity = ClassEntity::new(
            self.node_text(&name_node),
            &self.source.path,
            start_line(node),
        )
        .with_decorators(self.annotations(node));

        if let Some(superclass) = node.child_by_field_name("superclass") {
            if let Some(base) = superclass.named_child(0) {
                entity.bases.push(self.node_text(&base));
            }
        }
        entity.bases.extend(self.super_interfaces(node));

        self.ir.classes.push(entity);
        Some(self.ir.classes.len() - 1)
    }

    fn record_interface(&mut self, node: &Node) -> Option<usize> {
        let name_node = node.child_by_field_name("name")?;
        let mut entity = ClassEntity::new(
            self.node_text(&name_node),
            &self.source.path,
            start_line(node),
        )
        .with_decorators(self.annotations(node));

        // `extends_interfaces` is a plain child, not a field.
        for i in 0..node.named_child_count() {
            if let Some(child) = node.named_child(i) {
                if child.kind() == "extends_interfaces" {
                    entity.bases.extend(self.type_list(&child));
                }
            }
        }

        self.ir.classes.push(entity);
        Some(self.ir.classes.len() - 1)
    }

    fn super_interfaces(&self, node: &Node) -> Vec<String> {
        let mut bases = Vec::new();
        if let Some(interfaces) = node.child_by_field_name("interfaces") {
            bases.extend(self.type_list(&interfaces));
        }
        bases
    }

    fn type_list(&self, node: &Node) -> Vec<String> {
        let mut types = Vec::new();
        for i in 0..node.named_child_count() {
            let Some(child) = node.named_child(i) else {
                continue;
            };
            if child.kind() == "type_list" {
                for j in 0..child.named_child_count() {
                    if let Some(entry) = child.named_child(j) {
                        types.push(self.node_text(&entry));
                    }
                }
            } else {
                types.push(self.node_text(&child));
            }
        }
        types
    }

    fn record_components(&self, node: &Node) -> Vec<String> {
        let mut components = Vec::new();
        if let Some(parameters) = node.child_by_field_name("parameters") {
            for i in 0..parameters.named_child_count() {
                if let Some(parameter) = parameters.named_child(i) {
                    if let Some(name) = parameter.child_by_field_name("name") {
                        components.push(self.node_text(&name));
                    }
                }
            }
        }
        components
    }

    /// Annotation tags from the declaration's `modifiers` child, `@` dropped.
    fn annotations(&self, node: &Node) -> Vec<String> {
        let mut annotations = Vec::new();
        for i in 0..node.named_child_count() {
            let Some(child) = node.named_child(i) else {
                continue;
            };
            if child.kind() != "modifiers" {
                continue;
            }
            for j in 0..child.named_child_count() {
                if let Some(modifier) = child.named_child(j) {
                    if matches!(modifier.kind(), "marker_annotation" | "annotation") {
                        annotations
                            .push(self.node_text(&modifier).trim_start_matches('@').to_string());
                    }
                }
            }
        }
        annotations
    }

    fn parameters(&self, node: &Node) -> Vec<String> {
        let mut params = Vec::new();
        let Some(parameters) = node.child_by_field_name("parameters") else {
            return params;
        };
        for i in 0..parameters.named_child_count() {
            let Some(parameter) = parameters.named_child(i) else {
                continue;
            };
            match parameter.kind() {
                "formal_parameter" => {
                    if let Some(name) = parameter.child_by_field_name("name") {
                        params.push(self.node_text(&name));
                    }
                }
                "spread_parameter" => {
                    for j in 0..parameter.named_child_count() {
                        if let Some(child) = parameter.named_child(j) {
                            if child.kind() == "variable_declarator" {
                                if let Some(name) = child.child_by_field_name("name") {
                                    params.push(self.node_text(&name));
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        params
    }

    fn node_text(&self, node: &Node) -> String {
        node.utf8_text(self.source.content.as_bytes())
            .unwrap_or("")
            .to_string()
    }
}

fn start_line(node: &Node) -> u32 {
    (node.start_position().row + 1) as u32
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{parse_fixture, test_guard};
    use super::*;
    use adg_core::Language;

    fn extract(content: &str) -> FileIr {
        let (tree, source) = parse_fixture(Language::Java, "src/main/java/App.java", content);
        JavaExtractor::extract(&tree, &source, &mut test_guard()).unwrap()
    }

    #[test]
    fn annotated_class_with_members() {
        let ir = extract(
            r#"
package app;

import java.util.List;
import static java.util.Objects.requireNonNull;

@Service
public class UserService extends BaseService implements AutoCloseable, Runnable {
    private final List<String> cache = null;
    private int hits, misses;

    public UserService(List<String> cache) {
        this.cache = cache;
    }

    @Override
    public void run() {
    }

    public String find(String id, int... flags) {
        return id;
    }
}
"#,
        );
        assert_eq!(ir.classes.len(), 1);
        let class = &ir.classes[0];
        assert_eq!(class.name, "UserService");
        assert_eq!(class.bases, vec!["BaseService", "AutoCloseable", "Runnable"]);
        assert_eq!(class.decorators, vec!["Service"]);
        assert_eq!(class.attributes, vec!["cache", "hits", "misses"]);
        assert_eq!(class.methods, vec!["UserService", "run", "find"]);

        let run = ir.functions.iter().find(|f| f.name == "run").unwrap();
        assert_eq!(run.return_type.as_deref(), Some("void"));
        assert_eq!(run.decorators, vec!["Override"]);

        let find = ir.functions.iter().find(|f| f.name == "find").unwrap();
        assert_eq!(find.params, vec!["id", "flags"]);

        let modules: Vec<&str> = ir.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(modules, vec!["java.util.List", "java.util.Objects.requireNonNull"]);
    }

    #[test]
    fn interface_constants_and_signatures() {
        let ir = extract(
            "public interface Repo extends AutoCloseable {\n    int LIMIT = 10;\n    String get(String id);\n}\n",
        );
        let interface = &ir.classes[0];
        assert_eq!(interface.name, "Repo");
        assert_eq!(interface.bases, vec!["AutoCloseable"]);
        assert_eq!(interface.attributes, vec!["LIMIT"]);
        assert_eq!(interface.methods, vec!["get"]);
    }

    #[test]
    fn enum_constants_and_methods() {
        let ir = extract(
            "public enum State {\n    OPEN, CLOSED;\n\n    public boolean done() {\n        return this == CLOSED;\n    }\n}\n",
        );
        let class = &ir.classes[0];
        assert_eq!(class.attributes, vec!["OPEN", "CLOSED"]);
        assert_eq!(class.methods, vec!["done"]);
    }

    #[test]
    fn nested_class_is_its_own_entity() {
        let ir = extract(
            "public class Outer {\n    class Inner {\n        void ping() {}\n    }\n}\n",
        );
        let names: Vec<&str> = ir.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Outer", "Inner"]);
        assert_eq!(ir.classes[1].methods, vec!["ping"]);
        assert!(ir.classes[0].methods.is_empty());
    }
}
