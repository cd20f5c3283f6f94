use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Diagram archetypes the detector can recommend. Variant order is the
/// declaration order used to break score ties, so it is part of the output
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Archetype {
    ClassDiagram,
    ErDiagram,
    SequenceDiagram,
    Flowchart,
    ComponentDiagram,
}

impl Archetype {
    pub const ALL: [Archetype; 5] = [
        Archetype::ClassDiagram,
        Archetype::ErDiagram,
        Archetype::SequenceDiagram,
        Archetype::Flowchart,
        Archetype::ComponentDiagram,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::ClassDiagram => "classDiagram",
            Archetype::ErDiagram => "erDiagram",
            Archetype::SequenceDiagram => "sequenceDiagram",
            Archetype::Flowchart => "flowchart",
            Archetype::ComponentDiagram => "componentDiagram",
        }
    }

    /// Position in declaration order, used as the deterministic tie-break.
    pub fn rank(&self) -> usize {
        Self::ALL
            .iter()
            .position(|a| a == self)
            .unwrap_or(Self::ALL.len())
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Archetype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classDiagram" => Ok(Archetype::ClassDiagram),
            "erDiagram" => Ok(Archetype::ErDiagram),
            "sequenceDiagram" => Ok(Archetype::SequenceDiagram),
            "flowchart" => Ok(Archetype::Flowchart),
            "componentDiagram" => Ok(Archetype::ComponentDiagram),
            other => Err(format!("unrecognized archetype: {}", other)),
        }
    }
}
