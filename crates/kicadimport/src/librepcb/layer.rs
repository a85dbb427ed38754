use serde::{Deserialize, Serialize};

/// Layers of LibrePCB symbols and footprints used by the importer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    SymOutlines,
    SymNames,
    SymValues,
    BrdOutlines,
    BrdComments,
    BrdDocumentation,
    #[serde(rename = "top_cu")]
    TopCopper,
    #[serde(rename = "bot_cu")]
    BotCopper,
    TopStopMask,
    BotStopMask,
    TopSolderPaste,
    BotSolderPaste,
    TopLegend,
    BotLegend,
    TopGlue,
    BotGlue,
    TopCourtyard,
    BotCourtyard,
    TopDocumentation,
    BotDocumentation,
    TopNames,
    TopValues,
}

impl Layer {
    /// Human readable layer name
    pub fn name(self) -> &'static str {
        match self {
            Layer::SymOutlines => "Outlines",
            Layer::SymNames => "Names",
            Layer::SymValues => "Values",
            Layer::BrdOutlines => "Board Outlines",
            Layer::BrdComments => "Comments",
            Layer::BrdDocumentation => "Documentation",
            Layer::TopCopper => "Top Copper",
            Layer::BotCopper => "Bottom Copper",
            Layer::TopStopMask => "Top Solder Resist",
            Layer::BotStopMask => "Bottom Solder Resist",
            Layer::TopSolderPaste => "Top Solder Paste",
            Layer::BotSolderPaste => "Bottom Solder Paste",
            Layer::TopLegend => "Top Legend",
            Layer::BotLegend => "Bottom Legend",
            Layer::TopGlue => "Top Glue",
            Layer::BotGlue => "Bottom Glue",
            Layer::TopCourtyard => "Top Courtyard",
            Layer::BotCourtyard => "Bottom Courtyard",
            Layer::TopDocumentation => "Top Documentation",
            Layer::BotDocumentation => "Bottom Documentation",
            Layer::TopNames => "Top Names",
            Layer::TopValues => "Top Values",
        }
    }

    pub fn is_board_edge(self) -> bool {
        self == Layer::BrdOutlines
    }

    /// Polygons on these layers describe filled areas rather than outlines
    pub fn polygons_represent_areas(self) -> bool {
        matches!(
            self,
            Layer::TopCopper
                | Layer::BotCopper
                | Layer::TopStopMask
                | Layer::BotStopMask
                | Layer::TopSolderPaste
                | Layer::BotSolderPaste
                | Layer::TopGlue
                | Layer::BotGlue
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_ids() {
        assert_eq!(serde_json::to_string(&Layer::TopCopper).unwrap(), "\"top_cu\"");
        assert_eq!(serde_json::to_string(&Layer::SymOutlines).unwrap(), "\"sym_outlines\"");
        assert_eq!(
            serde_json::from_str::<Layer>("\"brd_documentation\"").unwrap(),
            Layer::BrdDocumentation
        );
        assert!(Layer::TopSolderPaste.polygons_represent_areas());
        assert!(!Layer::TopLegend.polygons_represent_areas());
    }
}
