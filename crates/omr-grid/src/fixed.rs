use crate::{FixedGridParams, LayoutSpec, Placement, Region, RegionGrid};
use omr_core::{CellRect, OPTION_COUNT};
use std::collections::BTreeMap;

/// Block index and row within the block of a 1-based question number.
fn block_and_row(question: u32, rows_per_column: u32) -> (u32, u32) {
    let i = question - 1;
    (i / rows_per_column, i % rows_per_column)
}

fn row_of_cells(
    x0: f32,
    y0: f32,
    pitch: f32,
    cell_w: f32,
    cell_h: f32,
    inset: f32,
) -> [Region; OPTION_COUNT] {
    std::array::from_fn(|k| {
        Region::window(CellRect::new(x0 + k as f32 * pitch, y0, cell_w, cell_h).inset(inset))
    })
}

/// Option regions computed from layout parameters alone.
///
/// Depends only on its arguments, so identical inputs give identical grids.
pub fn fixed_grid(
    layout: &LayoutSpec,
    params: &FixedGridParams,
    width: usize,
    height: usize,
) -> RegionGrid {
    let n = layout.questions;
    let columns = layout.columns.max(1);
    let rows = layout.rows_per_column().max(1);
    let inset = params.cell_inset;
    let mut questions = BTreeMap::new();
    let mut column_divider = None;

    match &params.placement {
        Placement::Relative(rel) => {
            let block_w = width as f32 / columns as f32;
            let util_w = block_w * (1.0 - rel.label_frac);
            let util_h = height as f32 * (1.0 - rel.header_frac - rel.footer_frac);
            let y0 = height as f32 * rel.header_frac;
            let opt_w = util_w / OPTION_COUNT as f32;
            let row_h = util_h / rows as f32;

            for q in 1..=n {
                let (block, row) = block_and_row(q, rows);
                let x0 = block as f32 * block_w + block_w * rel.label_frac;
                let cells = row_of_cells(x0, y0 + row as f32 * row_h, opt_w, opt_w, row_h, inset);
                questions.insert(q, cells);
            }
            if columns == 2 {
                column_divider = Some(block_w);
            }
        }
        Placement::Absolute(abs) => {
            for q in 1..=n {
                let (block, row) = block_and_row(q, rows);
                let x0 = abs.origin_x + block as f32 * abs.block_offset;
                let y0 = abs.origin_y + row as f32 * abs.row_pitch;
                let cells = row_of_cells(x0, y0, abs.option_pitch, abs.cell_w, abs.cell_h, inset);
                questions.insert(q, cells);
            }
            if columns == 2 {
                let first_end =
                    abs.origin_x + (OPTION_COUNT - 1) as f32 * abs.option_pitch + abs.cell_w;
                column_divider = Some(0.5 * (first_end + abs.origin_x + abs.block_offset));
            }
        }
        Placement::Explicit(exp) => {
            for (q, cells) in (1..=n).zip(exp.cells.iter()) {
                questions.insert(q, cells.map(|c| Region::window(c.inset(inset))));
            }
        }
    }

    RegionGrid {
        questions,
        column_divider,
        dropped_rows: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AbsolutePlacement, ExplicitPlacement, RegionShape};
    use approx::assert_abs_diff_eq;

    #[test]
    fn relative_two_column_geometry() {
        let layout = LayoutSpec::fixed(44, 2, FixedGridParams::default());
        let grid = fixed_grid(&layout, &FixedGridParams::default(), 1000, 1400);
        assert_eq!(grid.len(), 44);
        assert_eq!(grid.column_divider, Some(500.0));

        let a1 = grid.get(1).unwrap()[0].rect;
        let row_h = 1120.0 / 22.0;
        assert_abs_diff_eq!(a1.x, 150.0 + 17.5, epsilon = 1e-3);
        assert_abs_diff_eq!(a1.y, 280.0 + row_h / 4.0, epsilon = 1e-3);
        assert_abs_diff_eq!(a1.w, 35.0, epsilon = 1e-3);
        assert_abs_diff_eq!(a1.h, row_h / 2.0, epsilon = 1e-3);

        let e22 = grid.get(22).unwrap()[4].rect;
        let a23 = grid.get(23).unwrap()[0].rect;
        assert!(e22.x < 500.0 && a23.x > 500.0);
        assert_abs_diff_eq!(a23.y, a1.y, epsilon = 1e-3);
        assert_eq!(grid.get(1).unwrap()[0].shape, RegionShape::Window);
    }

    #[test]
    fn odd_count_fills_left_block_first() {
        let layout = LayoutSpec::fixed(5, 2, FixedGridParams::default());
        let grid = fixed_grid(&layout, &FixedGridParams::default(), 400, 300);
        assert_eq!(grid.len(), 5);
        for q in 1..=3 {
            assert!(grid.get(q).unwrap()[0].rect.x < 200.0);
        }
        for q in 4..=5 {
            assert!(grid.get(q).unwrap()[0].rect.x > 200.0);
        }
    }

    #[test]
    fn absolute_placement_uses_pitches() {
        let params = FixedGridParams {
            placement: Placement::Absolute(AbsolutePlacement {
                origin_x: 100.0,
                origin_y: 50.0,
                row_pitch: 40.0,
                option_pitch: 30.0,
                cell_w: 20.0,
                cell_h: 20.0,
                block_offset: 300.0,
            }),
            cell_inset: 0.0,
        };
        let layout = LayoutSpec::fixed(4, 2, params.clone());
        let grid = fixed_grid(&layout, &params, 800, 600);
        assert_eq!(grid.get(2).unwrap()[3].rect, CellRect::new(190.0, 90.0, 20.0, 20.0));
        assert_eq!(grid.get(3).unwrap()[0].rect, CellRect::new(400.0, 50.0, 20.0, 20.0));
        assert_eq!(grid.column_divider, Some(0.5 * (240.0 + 400.0)));
    }

    #[test]
    fn explicit_cells_are_taken_in_order_up_to_question_count() {
        let row = |y: f32| std::array::from_fn(|k| CellRect::new(10.0 * k as f32, y, 8.0, 8.0));
        let params = FixedGridParams {
            placement: Placement::Explicit(ExplicitPlacement {
                cells: vec![row(0.0), row(20.0), row(40.0)],
            }),
            cell_inset: 0.25,
        };
        let layout = LayoutSpec::fixed(2, 1, params.clone());
        let grid = fixed_grid(&layout, &params, 100, 100);
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.get(2).unwrap()[1].rect, CellRect::new(12.0, 22.0, 4.0, 4.0));
    }

    #[test]
    fn fixed_grid_is_deterministic() {
        let layout = LayoutSpec::fixed(30, 2, FixedGridParams::default());
        let a = fixed_grid(&layout, &FixedGridParams::default(), 827, 1169);
        let b = fixed_grid(&layout, &FixedGridParams::default(), 827, 1169);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }
}
