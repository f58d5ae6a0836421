use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::{id_by_name, BlockId, BEDROCK, COAL_ORE, DIRT, GRASS, IRON_ORE, LEAVES, STONE, WOOD};

/// Tool classes recognised by the break-time table.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Tool {
    Hand = 0,
    Pickaxe = 1,
    Axe = 2,
    Shovel = 3,
}

impl Tool {
    pub const COUNT: usize = 4;

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    fn from_key(key: &str) -> Option<Tool> {
        match key {
            "hand" => Some(Tool::Hand),
            "pickaxe" => Some(Tool::Pickaxe),
            "axe" => Some(Tool::Axe),
            "shovel" => Some(Tool::Shovel),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BreakConfig {
    #[serde(default)]
    blocks: Vec<BreakDef>,
}

#[derive(Debug, Deserialize)]
struct BreakDef {
    name: String,
    #[serde(default, flatten)]
    times: HashMap<String, f32>,
}

/// Break-time lookup per (block, tool), in seconds. The contents are
/// configuration: a built-in default table plus an optional TOML override.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    break_times: HashMap<BlockId, [f32; Tool::COUNT]>,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl BlockRegistry {
    pub fn builtin() -> Self {
        let mut break_times = HashMap::new();
        let row = |hand: f32, pickaxe: f32, axe: f32, shovel: f32| [hand, pickaxe, axe, shovel];
        break_times.insert(GRASS, row(0.9, 0.9, 0.9, 0.45));
        break_times.insert(DIRT, row(0.75, 0.75, 0.75, 0.4));
        break_times.insert(STONE, row(7.5, 1.15, 7.5, 7.5));
        break_times.insert(
            BEDROCK,
            row(
                f32::INFINITY,
                f32::INFINITY,
                f32::INFINITY,
                f32::INFINITY,
            ),
        );
        break_times.insert(WOOD, row(3.0, 3.0, 1.5, 3.0));
        break_times.insert(LEAVES, row(0.35, 0.35, 0.35, 0.35));
        break_times.insert(COAL_ORE, row(15.0, 2.25, 15.0, 15.0));
        break_times.insert(IRON_ORE, row(15.0, 2.25, 15.0, 15.0));
        Self { break_times }
    }

    /// Loads a TOML table that overrides the built-in rows. Unknown block
    /// names are rejected; missing tool keys keep the built-in value.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: BreakConfig = toml::from_str(text)?;
        let mut reg = Self::builtin();
        for def in cfg.blocks {
            let id = id_by_name(&def.name)
                .ok_or_else(|| format!("unknown block in break table: {}", def.name))?;
            let row = reg
                .break_times
                .entry(id)
                .or_insert([f32::INFINITY; Tool::COUNT]);
            for (key, secs) in &def.times {
                if let Some(tool) = Tool::from_key(key) {
                    row[tool.index()] = *secs;
                }
            }
        }
        Ok(reg)
    }

    /// Seconds to break `block` with `tool`. Unknown ids (air included)
    /// break instantly; bedrock never does.
    #[inline]
    pub fn break_time(&self, block: BlockId, tool: Tool) -> f32 {
        self.break_times
            .get(&block)
            .map(|row| row[tool.index()])
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AIR;

    #[test]
    fn bedrock_is_unbreakable() {
        let reg = BlockRegistry::builtin();
        assert!(reg.break_time(BEDROCK, Tool::Hand).is_infinite());
        assert!(reg.break_time(BEDROCK, Tool::Pickaxe).is_infinite());
    }

    #[test]
    fn air_breaks_instantly() {
        let reg = BlockRegistry::builtin();
        assert_eq!(reg.break_time(AIR, Tool::Hand), 0.0);
    }

    #[test]
    fn toml_override_replaces_listed_tools_only() {
        let reg = BlockRegistry::from_toml(
            r#"
            [[blocks]]
            name = "stone"
            pickaxe = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(reg.break_time(STONE, Tool::Pickaxe), 0.5);
        assert_eq!(reg.break_time(STONE, Tool::Hand), 7.5);
    }

    #[test]
    fn unknown_block_name_is_an_error() {
        assert!(BlockRegistry::from_toml("[[blocks]]\nname = \"marble\"\n").is_err());
    }
}
