/*!
 * Clustering of recognized symbols into spatial lines.
 *
 * Runs independently per engine; no cross-engine coupling happens here.
 * A symbol joins an existing line when its vertical band overlaps the
 * line's band beyond the configured ratio and its center is close enough
 * to the line's center. A stray symbol forms its own one-element line.
 */

use log::debug;

use crate::app_config::GroupingConfig;
use crate::recognition::{EngineSource, RecognizedSymbol};

/// An ordered sequence of symbols from one engine sharing a vertical band.
#[derive(Debug, Clone)]
pub struct Line {
    /// Engine that produced every symbol in this line
    pub source: EngineSource,
    /// Symbols ordered left-to-right
    pub symbols: Vec<RecognizedSymbol>,
    /// Vertical band (top, bottom) covered by the line
    pub band: (f32, f32),
}

impl Line {
    /// Band height of the line.
    pub fn height(&self) -> f32 {
        self.band.1 - self.band.0
    }

    /// Vertical center of the line's band.
    pub fn center_y(&self) -> f32 {
        (self.band.0 + self.band.1) / 2.0
    }

    /// Overlap of this line's band with another band, as a fraction of the
    /// smaller band height.
    pub fn band_overlap(&self, other: &(f32, f32)) -> f32 {
        let overlap = (self.band.1.min(other.1) - self.band.0.max(other.0)).max(0.0);
        let min_h = (self.band.1 - self.band.0).min(other.1 - other.0);
        if min_h <= 0.0 { 0.0 } else { (overlap / min_h).min(1.0) }
    }

    /// Concatenated text of the line in reading order.
    pub fn text(&self) -> String {
        self.symbols.iter().map(|s| s.symbol.as_str()).collect()
    }
}

/// Cluster one engine's symbols into lines.
///
/// Symbols are considered in top-to-bottom order; each either joins the
/// best-overlapping open line or opens a new one. Output lines are ordered
/// by band top, symbols within a line left-to-right, and every symbol
/// receives its final line index.
pub fn group_lines(
    source: EngineSource,
    mut symbols: Vec<RecognizedSymbol>,
    config: &GroupingConfig,
) -> Vec<Line> {
    if symbols.is_empty() {
        return Vec::new();
    }

    symbols.sort_by(|a, b| {
        a.bbox
            .center_y()
            .partial_cmp(&b.bbox.center_y())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.bbox
                    .center_x()
                    .partial_cmp(&b.bbox.center_x())
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    let mut lines: Vec<Line> = Vec::new();

    for symbol in symbols {
        let band = (symbol.bbox.y, symbol.bbox.bottom());
        let max_center_distance = config.max_center_distance_ratio * symbol.bbox.h.max(1.0);

        let best = lines
            .iter_mut()
            .filter(|line| {
                line.band_overlap(&band) >= config.min_band_overlap
                    && (line.center_y() - symbol.bbox.center_y()).abs() <= max_center_distance
            })
            .max_by(|a, b| {
                a.band_overlap(&band)
                    .partial_cmp(&b.band_overlap(&band))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

        match best {
            Some(line) => {
                line.band.0 = line.band.0.min(band.0);
                line.band.1 = line.band.1.max(band.1);
                line.symbols.push(symbol);
            }
            None => lines.push(Line {
                source,
                symbols: vec![symbol],
                band,
            }),
        }
    }

    lines.sort_by(|a, b| {
        a.band
            .0
            .partial_cmp(&b.band.0)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for (index, line) in lines.iter_mut().enumerate() {
        line.symbols.sort_by(|a, b| {
            a.bbox
                .center_x()
                .partial_cmp(&b.bbox.center_x())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for symbol in &mut line.symbols {
            symbol.line_index = Some(index);
        }
    }

    debug!("Grouped symbols from {} into {} lines", source, lines.len());

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    fn symbol(ch: &str, x: f32, y: f32, confidence: f32) -> RecognizedSymbol {
        RecognizedSymbol {
            bbox: BoundingBox::new(x, y, 10.0, 10.0),
            symbol: ch.to_string(),
            confidence,
            source: EngineSource::Primary,
            line_index: None,
        }
    }

    #[test]
    fn test_groupLines_withEmptyInput_shouldReturnEmpty() {
        let lines = group_lines(EngineSource::Primary, vec![], &GroupingConfig::default());
        assert!(lines.is_empty());
    }

    #[test]
    fn test_groupLines_withTwoRows_shouldFormTwoLines() {
        let symbols = vec![
            symbol("一", 0.0, 0.0, 0.9),
            symbol("二", 12.0, 1.0, 0.9),
            symbol("三", 0.0, 40.0, 0.9),
        ];

        let lines = group_lines(EngineSource::Primary, symbols, &GroupingConfig::default());

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "一二");
        assert_eq!(lines[1].text(), "三");
    }

    #[test]
    fn test_groupLines_shouldOrderSymbolsLeftToRight() {
        let symbols = vec![
            symbol("乙", 30.0, 0.0, 0.9),
            symbol("甲", 0.0, 0.5, 0.9),
            symbol("丙", 60.0, 1.0, 0.9),
        ];

        let lines = group_lines(EngineSource::Primary, symbols, &GroupingConfig::default());

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "甲乙丙");
    }

    #[test]
    fn test_groupLines_shouldAssignLineIndices() {
        let symbols = vec![symbol("一", 0.0, 0.0, 0.9), symbol("二", 0.0, 50.0, 0.9)];

        let lines = group_lines(EngineSource::Primary, symbols, &GroupingConfig::default());

        assert_eq!(lines[0].symbols[0].line_index, Some(0));
        assert_eq!(lines[1].symbols[0].line_index, Some(1));
    }

    #[test]
    fn test_groupLines_withStraySymbol_shouldFormSingletonLine() {
        let symbols = vec![
            symbol("一", 0.0, 0.0, 0.9),
            symbol("二", 12.0, 0.0, 0.9),
            // Far below everything else
            symbol("点", 5.0, 200.0, 0.3),
        ];

        let lines = group_lines(EngineSource::Primary, symbols, &GroupingConfig::default());

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].symbols.len(), 1);
        assert_eq!(lines[1].text(), "点");
    }
}
