use super::DetectedCircle;
use crate::{DetectedGridParams, DroppedRow, Region, RegionGrid};
use log::{debug, warn};
use omr_core::{Circle, OPTION_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Partition detections into column blocks, left block first.
///
/// With two columns the boundary is the midpoint of the detected x-range,
/// which is also returned.
pub fn split_columns(circles: &[DetectedCircle], columns: u32) -> (Vec<Vec<Circle>>, Option<f32>) {
    let all: Vec<Circle> = circles.iter().map(|d| d.circle).collect();
    if columns < 2 || all.is_empty() {
        return (vec![all], None);
    }
    let (lo, hi) = all.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), c| {
        (lo.min(c.center.x), hi.max(c.center.x))
    });
    let mid = 0.5 * (lo + hi);
    let (left, right): (Vec<Circle>, Vec<Circle>) = all.into_iter().partition(|c| c.center.x < mid);
    (vec![left, right], Some(mid))
}

/// What happened to one clustered row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RowOutcome {
    /// Exactly five marks, assigned A-E left to right.
    Mapped { options: [Circle; OPTION_COUNT] },
    /// A question line with the wrong number of marks.
    WrongCount { detections: usize },
    /// Beyond the layout's question count.
    BeyondLayout { detections: usize },
    /// Too few marks and off the row pitch; consumes no number.
    Noise { detections: usize },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    pub column: usize,
    /// y of the row's reference (first) detection.
    pub y: f32,
    pub question: Option<u32>,
    #[serde(flatten)]
    pub outcome: RowOutcome,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RowAssembly {
    pub rows: Vec<RowRecord>,
}

impl RowAssembly {
    /// Rows accepted as question lines (numbered, whether mapped or not).
    pub fn question_rows(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| !matches!(r.outcome, RowOutcome::Noise { .. }))
            .count()
    }

    pub fn into_grid(self, column_divider: Option<f32>) -> RegionGrid {
        let mut questions = BTreeMap::new();
        let mut dropped_rows = Vec::new();
        for row in self.rows {
            match row.outcome {
                RowOutcome::Mapped { options } => {
                    if let Some(q) = row.question {
                        questions.insert(q, options.map(Region::disk));
                    }
                }
                RowOutcome::WrongCount { detections } | RowOutcome::BeyondLayout { detections } => {
                    dropped_rows.push(DroppedRow {
                        question: row.question,
                        column: row.column,
                        y: row.y,
                        detections,
                    })
                }
                RowOutcome::Noise { .. } => {}
            }
        }
        RegionGrid {
            questions,
            column_divider,
            dropped_rows,
        }
    }
}

/// Median gap between consecutive full rows; `None` with fewer than two.
fn row_pitch(full_ys: &[f32]) -> Option<f32> {
    let mut gaps: Vec<f32> = full_ys.windows(2).map(|w| w[1] - w[0]).collect();
    if gaps.is_empty() {
        return None;
    }
    gaps.sort_by(f32::total_cmp);
    Some(gaps[(gaps.len() - 1) / 2])
}

/// Whether a sparse row at `y` sits on the row lattice of the full rows.
///
/// Inside the band spanned by the full rows it must keep half a pitch from
/// both neighbouring numbered rows; just outside the band it must lie about
/// one pitch from the nearest numbered row.
fn on_row_lattice(y: f32, prev: Option<f32>, full_ys: &[f32], pitch: Option<f32>) -> bool {
    let (Some(pitch), Some(&first), Some(&last)) = (pitch, full_ys.first(), full_ys.last()) else {
        return false;
    };
    let fits = |gap: f32| gap >= 0.5 * pitch;
    let about_one_pitch = |gap: f32| fits(gap) && gap <= 1.5 * pitch;

    if y < first {
        about_one_pitch(first - y)
    } else if y > last {
        prev.is_some_and(|p| about_one_pitch(y - p))
    } else {
        let next = full_ys.iter().copied().find(|&f| f > y).unwrap_or(last);
        prev.is_some_and(|p| fits(y - p)) && fits(next - y)
    }
}

/// Cluster each column's detections into rows and number them.
///
/// Detections join the current row while their y is within
/// `row_tolerance` of the row's first detection. Rows with at least
/// `min_row_detections` marks are full rows. A sparser row still takes a
/// question number when it lies on the pitch of the full rows (a question
/// whose bubbles were mostly missed), and is noise otherwise. Numbered
/// rows run left column top to bottom, then the right column, and are
/// mapped only when they hold exactly five marks.
pub fn assemble_rows(
    columns: &[Vec<Circle>],
    questions: u32,
    params: &DetectedGridParams,
) -> RowAssembly {
    let mut rows = Vec::new();
    let mut next_question = 1u32;

    for (column, circles) in columns.iter().enumerate() {
        let mut sorted = circles.clone();
        sorted.sort_by(|a, b| {
            a.center
                .y
                .total_cmp(&b.center.y)
                .then(a.center.x.total_cmp(&b.center.x))
        });

        let mut groups: Vec<Vec<Circle>> = Vec::new();
        for c in sorted {
            match groups.last_mut() {
                Some(g) if (c.center.y - g[0].center.y).abs() < params.row_tolerance => g.push(c),
                _ => groups.push(vec![c]),
            }
        }

        let full_ys: Vec<f32> = groups
            .iter()
            .filter(|g| g.len() >= params.min_row_detections)
            .map(|g| g[0].center.y)
            .collect();
        let pitch = row_pitch(&full_ys);
        let mut prev_numbered: Option<f32> = None;

        for mut group in groups {
            group.sort_by(|a, b| a.center.x.total_cmp(&b.center.x));
            let y = group[0].center.y;
            let detections = group.len();

            if detections < params.min_row_detections
                && !on_row_lattice(y, prev_numbered, &full_ys, pitch)
            {
                debug!("column {column}: ignoring {detections} stray mark(s) near y={y:.1}");
                rows.push(RowRecord {
                    column,
                    y,
                    question: None,
                    outcome: RowOutcome::Noise { detections },
                });
                continue;
            }

            prev_numbered = Some(y);
            let q = next_question;
            next_question += 1;
            let (question, outcome) = if q > questions {
                warn!("column {column}: row near y={y:.1} is beyond the {questions} layout questions");
                (None, RowOutcome::BeyondLayout { detections })
            } else if let Ok(options) = <[Circle; OPTION_COUNT]>::try_from(group.as_slice()) {
                (Some(q), RowOutcome::Mapped { options })
            } else {
                warn!(
                    "question {q}: row has {detections} marks, expected {OPTION_COUNT}; dropping"
                );
                (Some(q), RowOutcome::WrongCount { detections })
            };
            rows.push(RowRecord {
                column,
                y,
                question,
                outcome,
            });
        }
    }

    RowAssembly { rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    fn row(y: f32, xs: &[f32]) -> Vec<Circle> {
        xs.iter()
            .map(|&x| Circle::new(Point2::new(x, y), 8.0))
            .collect()
    }

    const FIVE: [f32; 5] = [100.0, 130.0, 160.0, 190.0, 220.0];

    #[test]
    fn numbers_rows_top_to_bottom_and_maps_options() {
        let mut col = row(200.0, &FIVE);
        col.extend(row(101.0, &FIVE));
        col.reverse();
        let asm = assemble_rows(&[col], 10, &DetectedGridParams::default());
        assert_eq!(asm.question_rows(), 2);

        let grid = asm.into_grid(None);
        let q1 = grid.get(1).unwrap();
        assert_eq!(q1[0].rect.center(), Point2::new(100.0, 101.0));
        assert_eq!(q1[4].rect.center(), Point2::new(220.0, 101.0));
        assert_eq!(grid.get(2).unwrap()[2].rect.center().y, 200.0);
    }

    #[test]
    fn short_rows_are_dropped_with_their_number() {
        let mut col = row(100.0, &FIVE);
        col.extend(row(140.0, &FIVE[..4]));
        col.extend(row(180.0, &FIVE[..2]));
        col.extend(row(220.0, &FIVE));
        let asm = assemble_rows(&[col], 4, &DetectedGridParams::default());

        let outcomes: Vec<_> = asm.rows.iter().map(|r| (r.question, r.outcome.clone())).collect();
        assert!(matches!(outcomes[1], (Some(2), RowOutcome::WrongCount { detections: 4 })));
        assert!(matches!(outcomes[2], (Some(3), RowOutcome::WrongCount { detections: 2 })));

        let grid = asm.into_grid(None);
        assert!(grid.get(2).is_none());
        assert!(grid.get(3).is_none());
        assert_eq!(grid.get(4).unwrap()[0].rect.center().y, 220.0);
        let dropped: Vec<_> = grid.dropped_rows.iter().map(|d| d.question).collect();
        assert_eq!(dropped, vec![Some(2), Some(3)]);
    }

    #[test]
    fn sparse_middle_row_keeps_later_numbering() {
        let col = [
            row(100.0, &FIVE),
            row(140.0, &FIVE),
            row(180.0, &FIVE[1..3]),
            row(220.0, &FIVE),
        ]
        .concat();
        let grid = assemble_rows(&[col], 4, &DetectedGridParams::default()).into_grid(None);

        assert_eq!(grid.get(2).unwrap()[0].rect.center().y, 140.0);
        assert!(grid.get(3).is_none());
        assert_eq!(grid.get(4).unwrap()[0].rect.center().y, 220.0);
        assert_eq!(grid.dropped_rows[0].question, Some(3));
        assert_eq!(grid.dropped_rows[0].detections, 2);
    }

    #[test]
    fn missed_first_row_is_numbered_from_the_pitch() {
        let col = [
            row(60.0, &FIVE[..1]),
            row(100.0, &FIVE),
            row(140.0, &FIVE),
        ]
        .concat();
        let grid = assemble_rows(&[col], 3, &DetectedGridParams::default()).into_grid(None);
        assert_eq!(grid.dropped_rows[0].question, Some(1));
        assert_eq!(grid.get(2).unwrap()[0].rect.center().y, 100.0);
        assert_eq!(grid.get(3).unwrap()[0].rect.center().y, 140.0);
    }

    #[test]
    fn specks_off_the_row_pitch_are_noise() {
        let mut col = [
            row(100.0, &FIVE),
            row(160.0, &FIVE),
            row(220.0, &FIVE),
            row(280.0, &FIVE),
        ]
        .concat();
        col.extend(row(185.0, &[115.0]));
        col.extend(row(5.0, &[115.0]));
        let asm = assemble_rows(&[col], 4, &DetectedGridParams::default());

        let noise: Vec<_> = asm
            .rows
            .iter()
            .filter(|r| matches!(r.outcome, RowOutcome::Noise { .. }))
            .map(|r| r.y)
            .collect();
        assert_eq!(noise, vec![5.0, 185.0]);
        let grid = asm.into_grid(None);
        assert_eq!(grid.len(), 4);
        assert!(grid.dropped_rows.is_empty());
    }

    #[test]
    fn right_column_continues_numbering() {
        let left = [row(100.0, &FIVE), row(140.0, &FIVE)].concat();
        let right_xs: Vec<f32> = FIVE.iter().map(|x| x + 400.0).collect();
        let right = row(100.0, &right_xs);
        let circles: Vec<DetectedCircle> = [left, right]
            .concat()
            .into_iter()
            .map(|circle| DetectedCircle {
                circle,
                score: 1.0,
                edge_support: 1.0,
            })
            .collect();

        let (cols, mid) = split_columns(&circles, 2);
        assert_eq!(mid, Some(0.5 * (100.0 + 620.0)));
        assert_eq!(cols[0].len(), 10);
        let grid = assemble_rows(&cols, 3, &DetectedGridParams::default()).into_grid(mid);
        assert_eq!(grid.get(3).unwrap()[0].rect.center().x, 500.0);
    }

    #[test]
    fn rows_beyond_question_count_are_reported() {
        let col = [row(100.0, &FIVE), row(140.0, &FIVE)].concat();
        let grid = assemble_rows(&[col], 1, &DetectedGridParams::default()).into_grid(None);
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.dropped_rows[0].question, None);
    }
}
