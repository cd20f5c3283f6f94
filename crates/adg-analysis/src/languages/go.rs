// ABOUTME: Go IR collector: structs and interfaces as classes, receivers as methods.
// ABOUTME: Embedded fields surface as bases since Go composes instead of inheriting.

use crate::guard::GuardState;
use adg_core::{ClassEntity, FileIr, FunctionEntity, ImportEdge, Result, SourceFile};
use tree_sitter::{Node, Tree, TreeCursor};

pub struct GoExtractor;

impl GoExtractor {
    pub fn extract(tree: &Tree, source: &SourceFile, guard: &mut GuardState) -> Result<FileIr> {
        let mut collector = GoCollector::new(source);
        let mut cursor = tree.walk();
        collector.walk(&mut cursor, 0, guard)?;
        Ok(collector.into_ir())
    }
}

impl super::IrExtractor for GoExtractor {
    fn extract(tree: &Tree, source: &SourceFile, guard: &mut GuardState) -> Result<FileIr> {
        GoExtractor::extract(tree, source, guard)
    }
}

struct GoCollector<'a> {
    source: &'a SourceFile,
    ir: FileIr,
    // Methods declared before their type still attach once the walk is done.
    pending_methods: Vec<(String, String)>,
}

impl<'a> GoCollector<'a> {
    fn new(source: &'a SourceFile) -> Self {
        Self {
            source,
            ir: FileIr::new(&source.path, source.language),
            pending_methods: Vec::new(),
        }
    }

    fn into_ir(mut self) -> FileIr {
        for (owner, method) in self.pending_methods.drain(..) {
            if let Some(class) = self.ir.classes.iter_mut().find(|c| c.name == owner) {
                class.methods.push(method);
            }
        }
        self.ir
    }

    fn walk(&mut self, cursor: &mut TreeCursor, depth: u32, guard: &mut GuardState) -> Result<()> {
        guard.enter(depth)?;
        guard.visit()?;
        let node = cursor.node();

        match node.kind() {
            "type_spec" => self.record_type_spec(&node),
            "function_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let mut entity = FunctionEntity::new(
                        self.node_text(&name_node),
                        &self.source.path,
                        start_line(&node),
                    )
                    .with_params(self.parameters(&node));
                    entity.return_type = node
                        .child_by_field_name("result")
                        .map(|n| self.node_text(&n));
                    self.ir.functions.push(entity);
                }
            }
            "method_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = self.node_text(&name_node);
                    if let Some(owner) = self.receiver_type(&node) {
                        self.pending_methods.push((owner, name.clone()));
                    }
                    let mut entity = FunctionEntity::new(name, &self.source.path, start_line(&node))
                        .with_params(self.parameters(&node));
                    entity.return_type = node
                        .child_by_field_name("result")
                        .map(|n| self.node_text(&n));
                    self.ir.functions.push(entity);
                }
            }
            "import_spec" => {
                if let Some(path) = node.child_by_field_name("path") {
                    let module = self.node_text(&path).trim_matches('"').to_string();
                    self.ir
                        .imports
                        .push(ImportEdge::new(&self.source.path, module));
                }
            }
            _ => {}
        }

        if cursor.goto_first_child() {
            loop {
                self.walk(cursor, depth + 1, guard)?;
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
            cursor.goto_parent();
        }
        Ok(())
    }

    fn record_type_spec(&mut self, node: &Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let Some(type_node) = node.child_by_field_name("type") else {
            return;
        };
        match type_node.kind() {
            "struct_type" => {
                let mut entity = ClassEntity::new(
                    self.node_text(&name_node),
                    &self.source.path,
                    start_line(node),
                );
                self.collect_struct_members(&type_node, &mut entity);
                self.ir.classes.push(entity);
            }
            "interface_type" => {
                let mut entity = ClassEntity::new(
                    self.node_text(&name_node),
                    &self.source.path,
                    start_line(node),
                );
                self.collect_interface_members(&type_node, &mut entity);
                self.ir.classes.push(entity);
            }
            // Aliases and function types are not class-like.
            _ => {}
        }
    }

    fn collect_struct_members(&self, type_node: &Node, entity: &mut ClassEntity) {
        let Some(list) = type_node
            .named_child(0)
            .filter(|n| n.kind() == "field_declaration_list")
        else {
            return;
        };
        for i in 0..list.named_child_count() {
            let Some(field) = list.named_child(i) else {
                continue;
            };
            if field.kind() != "field_declaration" {
                continue;
            }
            let mut names = Vec::new();
            let mut field_cursor = field.walk();
            for name in field.children_by_field_name("name", &mut field_cursor) {
                names.push(self.node_text(&name));
            }
            if names.is_empty() {
                // Embedded field: composition recorded as a base.
                if let Some(embedded) = field.child_by_field_name("type") {
                    entity.bases.push(self.embedded_type_name(&embedded));
                }
            } else {
                entity.attributes.extend(names);
            }
        }
    }

    fn collect_interface_members(&self, type_node: &Node, entity: &mut ClassEntity) {
        for i in 0..type_node.named_child_count() {
            let Some(member) = type_node.named_child(i) else {
                continue;
            };
            match member.kind() {
                "method_elem" | "method_spec" => {
                    if let Some(name) = member.child_by_field_name("name") {
                        entity.methods.push(self.node_text(&name));
                    }
                }
                "type_elem" | "type_identifier" | "qualified_type" => {
                    entity.bases.push(self.node_text(&member));
                }
                _ => {}
            }
        }
    }

    fn receiver_type(&self, node: &Node) -> Option<String> {
        let receiver = node.child_by_field_name("receiver")?;
        let declaration = receiver.named_child(0)?;
        let type_node = declaration.child_by_field_name("type")?;
        Some(self.embedded_type_name(&type_node))
    }

    /// `User` from `User`, `*User`, `pkg.User`, or `*User[T]`.
    fn embedded_type_name(&self, node: &Node) -> String {
        match node.kind() {
            "pointer_type" => node
                .named_child(0)
                .map(|n| self.embedded_type_name(&n))
                .unwrap_or_else(|| self.node_text(node)),
            "generic_type" => node
                .child_by_field_name("type")
                .map(|n| self.node_text(&n))
                .unwrap_or_else(|| self.node_text(node)),
            _ => self.node_text(node),
        }
    }

    fn parameters(&self, node: &Node) -> Vec<String> {
        let mut params = Vec::new();
        let Some(parameters) = node.child_by_field_name("parameters") else {
            return params;
        };
        for i in 0..parameters.named_child_count() {
            let Some(declaration) = parameters.named_child(i) else {
                continue;
            };
            if !matches!(
                declaration.kind(),
                "parameter_declaration" | "variadic_parameter_declaration"
            ) {
                continue;
            }
            let mut declaration_cursor = declaration.walk();
            for name in declaration.children_by_field_name("name", &mut declaration_cursor) {
                params.push(self.node_text(&name));
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
        let (tree, source) = parse_fixture(Language::Go, "internal/store/user.go", content);
        GoExtractor::extract(&tree, &source, &mut test_guard()).unwrap()
    }

    #[test]
    fn struct_fields_methods_and_embedding() {
        let ir = extract(
            r#"
package store

type User struct {
	ID    int
	Name, Email string
	BaseModel
}

func (u *User) Save(db *DB) error {
	return db.Put(u)
}

func NewUser(name string) *User {
	return &User{Name: name}
}
"#,
        );
        assert_eq!(ir.classes.len(), 1);
        let class = &ir.classes[0];
        assert_eq!(class.name, "User");
        assert_eq!(class.attributes, vec!["ID", "Name", "Email"]);
        assert_eq!(class.bases, vec!["BaseModel"]);
        assert_eq!(class.methods, vec!["Save"]);

        let names: Vec<&str> = ir.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Save", "NewUser"]);
        assert_eq!(ir.functions[0].params, vec!["db"]);
        assert_eq!(ir.functions[0].return_type.as_deref(), Some("error"));
    }

    #[test]
    fn interface_methods_and_embedded_interfaces() {
        let ir = extract(
            "package store\n\ntype Repo interface {\n\tGet(id string) (string, error)\n\tio.Closer\n}\n",
        );
        let class = &ir.classes[0];
        assert_eq!(class.name, "Repo");
        assert_eq!(class.methods, vec!["Get"]);
        assert_eq!(class.bases, vec!["io.Closer"]);
    }

    #[test]
    fn imports_single_and_grouped() {
        let ir = extract(
            "package main\n\nimport \"fmt\"\n\nimport (\n\t\"os\"\n\thttpx \"net/http\"\n\t_ \"embed\"\n)\n",
        );
        let modules: Vec<&str> = ir.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(modules, vec!["fmt", "os", "net/http", "embed"]);
    }

    #[test]
    fn method_before_type_still_attaches() {
        let ir = extract(
            "package x\n\nfunc (c Cache) Len() int { return 0 }\n\ntype Cache struct {\n\titems int\n}\n",
        );
        assert_eq!(ir.classes[0].methods, vec!["Len"]);
    }
}
