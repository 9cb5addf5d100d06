use image::{Rgb, RgbImage};
use regex::Regex;

use super::imageops::{Padding, hconcat, pad, resize_exact, resize_to_height, solid, vconcat};
use super::raster::GlyphRasterizer;
use super::text::{RenderRequest, glyph_error, render_text};
use crate::error::{CanvasError, Result};
use crate::style::Direction;

const DEFAULT_PATTERN: &str =
    r"[A-Za-z0-9<\p{P}\p{S}\x{3000}-\x{303F}\x{FF00}-\x{FFEF}]+|\S";
const ASCII_PATTERN: &str = r"[A-Za-z0-9<[:punct:]]+|\S";

/// Decides where one scatter cluster ends and the next begins.
///
/// Each regex match is one cluster; matches made only of whitespace are dropped.
#[derive(Debug, Clone)]
pub struct ClusterRule {
    pattern: Regex,
}

impl ClusterRule {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|err| {
            CanvasError::InvalidConfig(format!("invalid cluster pattern {:?}: {}", pattern, err))
        })?;
        Ok(Self { pattern })
    }

    /// Runs of ASCII letters, digits, punctuation and `<` only.
    pub fn ascii_runs() -> Self {
        Self {
            pattern: Regex::new(ASCII_PATTERN).expect("ascii cluster pattern is valid"),
        }
    }

    pub fn split(&self, text: &str) -> Vec<Cluster> {
        self.pattern
            .find_iter(text)
            .filter(|m| !m.as_str().chars().all(char::is_whitespace))
            .map(|m| Cluster {
                text: m.as_str().to_string(),
                start: m.start(),
            })
            .collect()
    }
}

impl Default for ClusterRule {
    /// ASCII alnum, Unicode punctuation and symbols, the CJK punctuation block,
    /// half/fullwidth forms and the MRZ filler `<` form runs; anything else stands alone.
    fn default() -> Self {
        Self {
            pattern: Regex::new(DEFAULT_PATTERN).expect("default cluster pattern is valid"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub text: String,
    /// Byte offset of the cluster in the source string.
    pub start: usize,
}

/// Clusters actually rendered for `text`: a lone cluster is broken into its chars.
pub fn scatter_units(rule: &ClusterRule, text: &str) -> Vec<Cluster> {
    let clusters = rule.split(text);
    if clusters.len() != 1 {
        return clusters;
    }
    text.char_indices()
        .filter(|(_, ch)| !ch.is_whitespace())
        .map(|(start, ch)| Cluster {
            text: ch.to_string(),
            start,
        })
        .collect()
}

pub struct ScatterRequest<'a> {
    pub text: &'a str,
    pub direction: Direction,
    pub text_color: Rgb<u8>,
    pub background_color: Rgb<u8>,
    pub aspect_ratio: f32,
    /// Length to fill along the writing axis.
    pub target_extent: u32,
    pub rule: &'a ClusterRule,
}

/// Renders every cluster on its own, with a blank separator unit between neighbours,
/// and spreads them to fill `target_extent`.
pub fn compose_scatter<R: GlyphRasterizer + ?Sized>(
    font: &R,
    request: &ScatterRequest<'_>,
) -> Result<RgbImage> {
    let text = request.text;
    let direction = request.direction;
    let bbox = font
        .bbox(text, direction)
        .map_err(|err| glyph_error(err, text, font.name()))?;
    let offset = font
        .offset(text, direction)
        .map_err(|err| glyph_error(err, text, font.name()))?;
    let ref_width = bbox.width().max(1) as u32;
    let ref_height = bbox.height().max(1) as u32;

    let units = scatter_units(request.rule, text);
    let mut images = if units.is_empty() {
        vec![solid(ref_width, ref_height, request.background_color)]
    } else {
        let render_unit = |unit: &str, along: Option<u32>| {
            let mut unit_request = RenderRequest::new(
                unit,
                direction,
                request.text_color,
                request.background_color,
            );
            match direction {
                Direction::Ltr => {
                    unit_request.width = along;
                    unit_request.height = Some(ref_height);
                }
                Direction::Ttb => {
                    unit_request.width = Some(ref_width);
                    unit_request.height = along;
                }
            }
            unit_request.offset = Some(offset);
            render_text(font, &unit_request).map(|result| result.image)
        };

        // Clusters never touch, even once the gap collapses on overflow.
        let separator = font
            .bbox(" ", direction)
            .map_err(|err| glyph_error(err, " ", font.name()))?;
        let separator_extent = match direction {
            Direction::Ltr => separator.width(),
            Direction::Ttb => separator.height(),
        }
        .max(1) as u32;

        let mut images = Vec::with_capacity(units.len() * 2 - 1);
        for (idx, unit) in units.iter().enumerate() {
            if idx > 0 {
                images.push(render_unit(" ", Some(separator_extent))?);
            }
            images.push(render_unit(&unit.text, None)?);
        }
        images
    };

    if request.aspect_ratio != 1.0 {
        images = images
            .iter()
            .map(|image| {
                let (w, h) = image.dimensions();
                match direction {
                    Direction::Ltr => {
                        resize_exact(image, (w as f32 / request.aspect_ratio) as u32, h)
                    }
                    Direction::Ttb => {
                        resize_exact(image, w, (h as f32 * request.aspect_ratio) as u32)
                    }
                }
            })
            .collect();
    }

    let mut images: Vec<RgbImage> = match direction {
        Direction::Ltr => {
            let align_h = images.iter().map(|image| image.height()).max().unwrap_or(1);
            images
                .iter()
                .map(|image| resize_to_height(image, align_h))
                .collect()
        }
        Direction::Ttb => {
            let align_w = images.iter().map(|image| image.width()).max().unwrap_or(1);
            images
                .iter()
                .map(|image| center_to_width(image, align_w, request.background_color))
                .collect()
        }
    };

    if images.len() == 1 {
        return Ok(images.remove(0));
    }

    let extents: u32 = images
        .iter()
        .map(|image| match direction {
            Direction::Ltr => image.width(),
            Direction::Ttb => image.height(),
        })
        .sum();
    let gap = request.target_extent.saturating_sub(extents) / (images.len() as u32 - 1);

    let mut parts = Vec::with_capacity(images.len() * 2 - 1);
    let last = images.len() - 1;
    for (idx, image) in images.into_iter().enumerate() {
        let (w, h) = image.dimensions();
        parts.push(image);
        if idx != last && gap > 0 {
            let block = match direction {
                Direction::Ltr => solid(gap, h, request.background_color),
                Direction::Ttb => solid(w, gap, request.background_color),
            };
            parts.push(block);
        }
    }

    Ok(match direction {
        Direction::Ltr => hconcat(&parts),
        Direction::Ttb => vconcat(&parts),
    })
}

/// Pads left and right up to `width`; an odd remainder goes to the right.
fn center_to_width(image: &RgbImage, width: u32, fill: Rgb<u8>) -> RgbImage {
    let total = width.saturating_sub(image.width());
    let left = total / 2;
    pad(
        image,
        Padding {
            left,
            right: total - left,
            ..Padding::default()
        },
        fill,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{BlockRasterizer, ascii_art};

    const INK: Rgb<u8> = Rgb([255, 255, 255]);
    const PAPER: Rgb<u8> = Rgb([0, 0, 0]);

    fn texts(clusters: &[Cluster]) -> Vec<&str> {
        clusters.iter().map(|cluster| cluster.text.as_str()).collect()
    }

    #[test]
    fn ascii_letters_form_one_run() {
        let rule = ClusterRule::default();
        assert_eq!(texts(&rule.split("Hello")), vec!["Hello"]);
        assert_eq!(texts(&rule.split("你好嗎")), vec!["你", "好", "嗎"]);
        assert_eq!(texts(&rule.split("P<UTO<<ERIKSSON")), vec!["P<UTO<<ERIKSSON"]);
    }

    #[test]
    fn cjk_punctuation_joins_the_run_class() {
        let rule = ClusterRule::default();
        assert_eq!(
            texts(&rule.split("你好，世界！ok")),
            vec!["你", "好", "，", "世", "界", "！ok"]
        );
        let ascii = ClusterRule::ascii_runs();
        assert_eq!(texts(&ascii.split("a，b")), vec!["a", "，", "b"]);
    }

    #[test]
    fn whitespace_never_forms_a_cluster() {
        let rule = ClusterRule::default();
        assert_eq!(texts(&rule.split("ab  cd\t中")), vec!["ab", "cd", "中"]);
        assert!(rule.split("   ").is_empty());
    }

    #[test]
    fn a_single_run_falls_back_to_chars() {
        let rule = ClusterRule::default();
        assert_eq!(texts(&scatter_units(&rule, "Hello")), vec!["H", "e", "l", "l", "o"]);
        assert_eq!(texts(&scatter_units(&rule, "Hi yo")), vec!["Hi", "yo"]);
        assert_eq!(texts(&scatter_units(&rule, "ab中")), vec!["ab", "中"]);
    }

    #[test]
    fn clusters_reassemble_the_source() {
        let rule = ClusterRule::default();
        let text = "Hello,世界<<12；ΑΒΓ";
        let units = scatter_units(&rule, text);
        let joined: String = units.iter().map(|unit| unit.text.as_str()).collect();
        assert_eq!(joined, text);
        for unit in &units {
            assert_eq!(&text[unit.start..unit.start + unit.text.len()], unit.text);
        }
    }

    #[test]
    fn custom_rule_rejects_bad_patterns() {
        assert!(ClusterRule::new("[unclosed").is_err());
        let digits = ClusterRule::new(r"\d+|\S").expect("pattern");
        assert_eq!(texts(&digits.split("ab12")), vec!["a", "b", "12"]);
    }

    fn request<'a>(
        text: &'a str,
        direction: Direction,
        target: u32,
        rule: &'a ClusterRule,
    ) -> ScatterRequest<'a> {
        ScatterRequest {
            text,
            direction,
            text_color: INK,
            background_color: PAPER,
            aspect_ratio: 1.0,
            target_extent: target,
            rule,
        }
    }

    #[test]
    fn gaps_fill_the_target_width() {
        let font = BlockRasterizer::sized("block", 2, 4, 3);
        let rule = ClusterRule::default();
        let image = compose_scatter(&font, &request("AB中", Direction::Ltr, 12, &rule))
            .expect("scatter");
        insta::assert_snapshot!(ascii_art(&image, PAPER), @r"
        ####....####
        ####....####
        ####....####
        ");
    }

    #[test]
    fn vertical_clusters_stack_with_gaps() {
        let font = BlockRasterizer::sized("block", 2, 4, 3);
        let rule = ClusterRule::default();
        let image = compose_scatter(&font, &request("AB中", Direction::Ttb, 12, &rule))
            .expect("scatter");
        assert_eq!(image.dimensions(), (3, 12));
        assert_eq!(*image.get_pixel(1, 3), INK);
        assert_eq!(*image.get_pixel(1, 4), PAPER);
        assert_eq!(*image.get_pixel(1, 8), INK);
    }

    #[test]
    fn overflow_collapses_the_gap() {
        let font = BlockRasterizer::sized("block", 2, 4, 3);
        let rule = ClusterRule::default();
        let image = compose_scatter(&font, &request("AB中文", Direction::Ltr, 5, &rule))
            .expect("scatter");
        insta::assert_snapshot!(ascii_art(&image, PAPER), @r"
        ####..####..####
        ####..####..####
        ####..####..####
        ");
    }

    #[test]
    fn aspect_ratio_scales_each_cluster_first() {
        let font = BlockRasterizer::sized("block", 2, 4, 3);
        let rule = ClusterRule::default();
        let mut req = request("AB中", Direction::Ltr, 20, &rule);
        req.aspect_ratio = 0.5;
        let image = compose_scatter(&font, &req).expect("scatter");
        assert_eq!(image.dimensions(), (20, 3));
        assert_eq!(*image.get_pixel(7, 1), INK);
        assert_eq!(*image.get_pixel(8, 1), PAPER);
        assert_eq!(*image.get_pixel(12, 1), INK);
    }

    #[test]
    fn blank_text_yields_a_background_block() {
        let font = BlockRasterizer::new("block");
        let rule = ClusterRule::default();
        let image = compose_scatter(&font, &request("   ", Direction::Ltr, 100, &rule))
            .expect("scatter");
        assert_eq!(image.dimensions(), (15, 16));
        assert!(image.pixels().all(|pixel| *pixel == PAPER));
    }

    #[test]
    fn single_char_is_returned_without_gaps() {
        let font = BlockRasterizer::new("block");
        let rule = ClusterRule::default();
        let image = compose_scatter(&font, &request("中", Direction::Ltr, 100, &rule))
            .expect("scatter");
        assert_eq!(image.dimensions(), (20, 16));
    }

    #[test]
    fn odd_padding_favours_the_right() {
        let image = solid(3, 2, INK);
        let padded = center_to_width(&image, 6, PAPER);
        assert_eq!(padded.dimensions(), (6, 2));
        assert_eq!(*padded.get_pixel(0, 0), PAPER);
        assert_eq!(*padded.get_pixel(1, 0), INK);
        assert_eq!(*padded.get_pixel(3, 0), INK);
        assert_eq!(*padded.get_pixel(4, 0), PAPER);
    }

    #[test]
    fn unsupported_glyphs_fail_the_whole_layout() {
        let font = BlockRasterizer::new("broken").missing("?");
        let rule = ClusterRule::default();
        let err = compose_scatter(&font, &request("ab?", Direction::Ltr, 100, &rule)).unwrap_err();
        assert!(matches!(err, CanvasError::GlyphRender { .. }));
    }
}
