//! Annotated rendering of a graded sheet.

use crate::grade::QuestionStatus;
use crate::grid::{Region, RegionShape};
use crate::pipeline::{to_image, SheetOutcome};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

const OUTLINE: Rgb<u8> = Rgb([170, 170, 170]);
const CORRECT: Rgb<u8> = Rgb([0, 170, 0]);
const INCORRECT: Rgb<u8> = Rgb([220, 0, 0]);
const MULTIPLE: Rgb<u8> = Rgb([255, 140, 0]);
const UNANSWERED: Rgb<u8> = Rgb([110, 110, 110]);
const EXPECTED: Rgb<u8> = Rgb([0, 90, 255]);
const DIVIDER: Rgb<u8> = Rgb([140, 140, 140]);

fn draw_region(img: &mut RgbImage, region: &Region, grow: i32, color: Rgb<u8>) {
    match region.shape {
        RegionShape::Disk(c) => {
            let centre = (c.center.x.round() as i32, c.center.y.round() as i32);
            let r = (c.radius.round() as i32 + grow).max(1);
            draw_hollow_circle_mut(img, centre, r, color);
        }
        RegionShape::Window => {
            let r = region.rect;
            let w = (r.w.round() as i32 + 2 * grow).max(1) as u32;
            let h = (r.h.round() as i32 + 2 * grow).max(1) as u32;
            let rect = Rect::at(r.x.round() as i32 - grow, r.y.round() as i32 - grow).of_size(w, h);
            draw_hollow_rect_mut(img, rect, color);
        }
    }
}

fn draw_thick(img: &mut RgbImage, region: &Region, color: Rgb<u8>) {
    for grow in 0..3 {
        draw_region(img, region, grow, color);
    }
}

/// Colour-coded copy of the rectified sheet.
///
/// Every option region is outlined. Marked options are green on correct
/// questions, red on incorrect ones and orange on multiple marks; blank
/// and undetected rows are outlined in dark gray. When the student missed,
/// the expected option is ringed in blue.
pub fn render_debug(outcome: &SheetOutcome) -> RgbImage {
    let sheet = &outcome.sheet.image;
    let mut img = match to_image(sheet) {
        Some(gray) => image::DynamicImage::ImageLuma8(gray).to_rgb8(),
        None => return RgbImage::new(0, 0),
    };

    if let Some(x) = outcome.grid.column_divider {
        let bottom = img.height() as f32;
        draw_line_segment_mut(&mut img, (x, 0.0), (x, bottom), DIVIDER);
    }

    for (q, regions) in outcome.grid.iter() {
        for region in regions {
            draw_region(&mut img, region, 0, OUTLINE);
        }

        let Some(detail) = outcome.result.details.get(&q) else {
            continue;
        };
        let mark_color = match detail.status {
            QuestionStatus::Correct => CORRECT,
            QuestionStatus::Incorrect => INCORRECT,
            QuestionStatus::Multiple => MULTIPLE,
            QuestionStatus::Blank | QuestionStatus::Undetected => {
                for region in regions {
                    draw_region(&mut img, region, 1, UNANSWERED);
                }
                UNANSWERED
            }
        };

        if let Some(decision) = &detail.detected {
            for option in decision.marked() {
                draw_thick(&mut img, &regions[option.index()], mark_color);
            }
        }
        if detail.status != QuestionStatus::Correct {
            draw_thick_ring(&mut img, &regions[detail.expected.index()]);
        }
    }
    img
}

fn draw_thick_ring(img: &mut RgbImage, region: &Region) {
    for grow in 4..6 {
        draw_region(img, region, grow, EXPECTED);
    }
}
