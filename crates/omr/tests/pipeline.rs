use approx::assert_relative_eq;
use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use omr::grade::{AnswerKey, Decision, QuestionStatus};
use omr::grid::{
    fixed_grid, AbsolutePlacement, DetectedGridParams, FillScoreParams, FixedGridParams,
    LayoutSpec, Placement,
};
use omr::rectify::{RectifyMode, TemplateAlignParams};
use omr::{
    ErrorKind, GradeJobConfig, GraderParams, KeySource, OptionLetter, RectifyParams, SheetGrader,
    SheetReport,
};
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use OptionLetter::*;

const PAPER: u8 = 230;
const INK: u8 = 20;

fn key(letters: &[OptionLetter]) -> AnswerKey {
    AnswerKey::new(
        letters
            .iter()
            .enumerate()
            .map(|(i, l)| (i as u32 + 1, *l))
            .collect(),
    )
    .unwrap()
}

fn fill_rect(img: &mut GrayImage, x0: f32, y0: f32, x1: f32, y1: f32, v: u8) {
    let (w, h) = img.dimensions();
    for y in (y0.max(0.0) as u32)..(y1.min(h as f32) as u32) {
        for x in (x0.max(0.0) as u32)..(x1.min(w as f32) as u32) {
            img.put_pixel(x, y, Luma([v]));
        }
    }
}

/// A 500x700 sheet on a dark desk, with the given options filled in.
fn photo(layout: &LayoutSpec, marks: &[(u32, OptionLetter)]) -> GrayImage {
    let (ox, oy, sw, sh) = (70.0, 60.0, 500usize, 700usize);
    let mut img = GrayImage::from_pixel(640, 840, Luma([35]));
    fill_rect(&mut img, ox, oy, ox + sw as f32, oy + sh as f32, PAPER);

    let grid = fixed_grid(layout, &FixedGridParams::default(), sw, sh);
    for &(q, option) in marks {
        let r = grid.get(q).unwrap()[option.index()].rect;
        fill_rect(
            &mut img,
            ox + r.x - 4.0,
            oy + r.y - 4.0,
            ox + r.x + r.w + 4.0,
            oy + r.y + r.h + 4.0,
            INK,
        );
    }
    img
}

fn bubbles(rows: &[(f32, usize)], filled: &[(f32, f32)]) -> GrayImage {
    let radius = 10.0f32;
    let mut centres = Vec::new();
    for &(y, n) in rows {
        for k in 0..n {
            centres.push((60.0 + 40.0 * k as f32, y));
        }
    }
    GrayImage::from_fn(280, 60 + 50 * rows.len() as u32, |x, y| {
        let dark = centres.iter().any(|&(cx, cy)| {
            let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            d <= radius && (d >= radius - 2.0 || filled.contains(&(cx, cy)))
        });
        Luma([if dark { 25 } else { 235 }])
    })
}

#[test]
fn photographed_sheet_is_graded_end_to_end() {
    let layout = LayoutSpec::fixed(10, 1, FixedGridParams::default());
    let answers = [A, B, C, D, E, A, B, C, D, E];
    let mut marks = vec![(1, A), (2, B), (3, C), (3, D), (5, A)];
    marks.extend((6..=10).map(|q| (q, answers[q as usize - 1])));
    let img = photo(&layout, &marks);

    let grader = SheetGrader::new(GraderParams::new(layout.clone()));
    let outcome = grader.grade_image(&img, &key(&answers)).unwrap();

    assert!(matches!(
        outcome.sheet.mode,
        RectifyMode::Boundary { from_polygon: true }
    ));
    let (w, h) = (outcome.sheet.image.width, outcome.sheet.image.height);
    assert!((w as i32 - 500).abs() <= 3 && (h as i32 - 700).abs() <= 3);

    let r = &outcome.result;
    assert_eq!(r.details[&1].status, QuestionStatus::Correct);
    assert_eq!(r.details[&3].status, QuestionStatus::Multiple);
    assert_eq!(r.details[&3].detected, Some(Decision::Multiple(vec![C, D])));
    assert_eq!(r.details[&4].status, QuestionStatus::Blank);
    assert_eq!(r.details[&5].status, QuestionStatus::Incorrect);
    assert_eq!((r.correct, r.errors, r.total), (7, 3, 10));
    assert_relative_eq!(r.grade, 7.0);
    assert!(outcome.issues.is_empty());
    assert_eq!(outcome.best_guesses[&5], A);
}

#[test]
fn blank_sheet_scores_zero() {
    let layout = LayoutSpec::fixed(5, 1, FixedGridParams::default());
    let img = photo(&layout, &[]);
    let grader = SheetGrader::new(GraderParams::new(layout));
    let outcome = grader.grade_image(&img, &key(&[A, B, C, D, E])).unwrap();

    assert_eq!(outcome.result.correct, 0);
    assert_eq!(outcome.result.errors, 5);
    assert_eq!(outcome.report.counts.blank, 5);
    assert!(outcome.result.check_consistency().is_ok());
}

#[test]
fn uniform_desk_has_no_sheet() {
    let layout = LayoutSpec::fixed(5, 1, FixedGridParams::default());
    let grader = SheetGrader::new(GraderParams::new(layout.clone()));
    let img = GrayImage::from_pixel(300, 300, Luma([120]));
    let err = grader.grade_image(&img, &key(&[A; 5])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoSheetDetected);

    let report = SheetReport::failed("desk.png", &layout, &err);
    assert!(report.result.is_none());
}

#[test]
fn detected_grid_drops_incomplete_rows() {
    let img = bubbles(
        &[(50.0, 5), (100.0, 5), (150.0, 4), (200.0, 5)],
        &[(100.0, 50.0), (60.0, 100.0), (140.0, 100.0)],
    );
    let layout = LayoutSpec::detected(4, 1, DetectedGridParams::default());
    let mut params = GraderParams::new(layout);
    params.rectify = RectifyParams::Identity;
    let grader = SheetGrader::new(params);
    let outcome = grader.grade_image(&img, &key(&[B, A, C, D])).unwrap();

    let status = |q: u32| outcome.result.details[&q].status;
    assert_eq!(status(1), QuestionStatus::Correct);
    assert_eq!(status(2), QuestionStatus::Multiple);
    assert_eq!(status(3), QuestionStatus::Undetected);
    assert_eq!(status(4), QuestionStatus::Blank);
    assert_eq!(outcome.grid.dropped_rows.len(), 1);
    assert_eq!(outcome.result.correct + outcome.result.errors, 4);
}

#[test]
fn unresolved_grid_still_reports_every_question() {
    let img = GrayImage::from_pixel(280, 260, Luma([235]));
    let layout = LayoutSpec::detected(3, 1, DetectedGridParams::default());
    let mut params = GraderParams::new(layout.clone());
    params.rectify = RectifyParams::Identity;
    let outcome = SheetGrader::new(params)
        .grade_image(&img, &key(&[A, B, C]))
        .unwrap();

    assert_eq!(outcome.result.errors, 3);
    assert_eq!(outcome.report.counts.undetected, 3);
    assert_eq!(outcome.issues[0].kind, ErrorKind::GridUnresolved);

    let report = SheetReport::from_outcome("blank.png", &layout, &outcome);
    assert!(report.is_success());
    assert!(report.questions.is_empty());
}

#[test]
fn raw_buffers_grade_like_images() {
    let layout = LayoutSpec::fixed(5, 1, FixedGridParams::default());
    let img = photo(&layout, &[(1, A), (2, B)]);
    let grader = SheetGrader::new(GraderParams::new(layout));
    let k = key(&[A, B, C, D, E]);

    let from_raw = grader
        .grade_raw(
            img.width() as usize,
            img.height() as usize,
            img.as_raw(),
            &k,
        )
        .unwrap();
    let from_image = grader.grade_image(&img, &k).unwrap();
    assert_eq!(from_raw.result, from_image.result);
    assert_eq!(from_raw.result.correct, 2);
}

#[test]
fn scores_round_trip_through_report_json() {
    let layout = LayoutSpec::fixed(3, 1, FixedGridParams::default());
    let img = photo(&layout, &[(2, C)]);
    let grader = SheetGrader::new(GraderParams::new(layout.clone()));
    let outcome = grader.grade_image(&img, &key(&[A, C, E])).unwrap();

    let report = SheetReport::from_outcome("sheet.png", &layout, &outcome);
    let json = serde_json::to_string(&report).unwrap();
    let back: SheetReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back.questions[&2].decision, Decision::Single(C));
    assert_eq!(back.questions[&2].best_guess, C);
    assert!(back.questions[&2].scores[2] > 0.9);
    assert_eq!(back.result.unwrap().correct, 1);
}

#[test]
fn bigger_key_than_layout_leaves_extra_questions_undetected() {
    let layout = LayoutSpec::fixed(2, 1, FixedGridParams::default());
    let img = photo(&layout, &[(1, A)]);
    let grader = SheetGrader::new(GraderParams::new(layout));
    let outcome = grader.grade_image(&img, &key(&[A, B, C])).unwrap();
    let details: BTreeMap<_, _> = outcome
        .result
        .details
        .iter()
        .map(|(q, d)| (*q, d.status))
        .collect();
    assert_eq!(details[&3], QuestionStatus::Undetected);
    assert_eq!(details[&1], QuestionStatus::Correct);
}

/// Blank form: a printed header texture above a three-question grid.
fn template_form() -> (GrayImage, GraderParams) {
    let mut img = GrayImage::from_pixel(260, 400, Luma([200]));
    let mut rng = rand::rngs::StdRng::seed_from_u64(5);
    for _ in 0..45 {
        let x = rng.gen_range(10..220);
        let y = rng.gen_range(10..180);
        let w = rng.gen_range(8..36);
        let h = rng.gen_range(8..36);
        let v = rng.gen_range(0..170u8);
        draw_filled_rect_mut(&mut img, Rect::at(x, y).of_size(w, h), Luma([v]));
    }

    let placement = Placement::Absolute(AbsolutePlacement {
        origin_x: 40.0,
        origin_y: 250.0,
        row_pitch: 40.0,
        option_pitch: 36.0,
        cell_w: 24.0,
        cell_h: 24.0,
        block_offset: 0.0,
    });
    let layout = LayoutSpec::fixed(
        3,
        1,
        FixedGridParams {
            placement,
            ..FixedGridParams::default()
        },
    );
    let mut params = GraderParams::new(layout);
    params.rectify = RectifyParams::Template(TemplateAlignParams::default());
    params.fill = FillScoreParams {
        ink_threshold: Some(100),
        ..FillScoreParams::default()
    };
    (img, params)
}

/// The form, filled in and shifted by (15, 10) on a larger page.
fn filled_form(form: &GrayImage, marks: &[(u32, OptionLetter)]) -> GrayImage {
    let (dx, dy) = (15u32, 10u32);
    let mut photo = GrayImage::from_pixel(300, 440, Luma([200]));
    for (x, y, p) in form.enumerate_pixels() {
        photo.put_pixel(x + dx, y + dy, *p);
    }
    for &(q, option) in marks {
        let x = 40 + 36 * option.index() as i32 + dx as i32;
        let y = 250 + 40 * (q as i32 - 1) + dy as i32;
        draw_filled_rect_mut(&mut photo, Rect::at(x, y).of_size(24, 24), Luma([20]));
    }
    photo
}

#[test]
fn template_aligned_photo_is_graded() {
    let (form, params) = template_form();
    let photo = filled_form(&form, &[(1, B), (2, D), (3, A)]);
    let grader = SheetGrader::with_template(params, &omr::gray_view(&form)).unwrap();
    let outcome = grader.grade_image(&photo, &key(&[B, D, C])).unwrap();

    assert_eq!(outcome.sheet.mode, RectifyMode::Template);
    assert_eq!(
        (outcome.sheet.image.width, outcome.sheet.image.height),
        (260, 400)
    );
    let r = &outcome.result;
    assert_eq!(r.details[&1].status, QuestionStatus::Correct);
    assert_eq!(r.details[&2].status, QuestionStatus::Correct);
    assert_eq!(r.details[&3].status, QuestionStatus::Incorrect);
    assert_eq!(outcome.best_guesses[&3], A);
    assert!(outcome.issues.is_empty());
}

#[test]
fn job_file_template_path_drives_alignment() {
    let dir = tempfile::tempdir().unwrap();
    let (form, grader) = template_form();
    form.save(dir.path().join("form.png")).unwrap();
    filled_form(&form, &[(1, C), (2, C), (3, E)])
        .save(dir.path().join("photo.png"))
        .unwrap();

    let job = GradeJobConfig {
        image_path: dir.path().join("photo.png"),
        answer_key: KeySource::Inline(BTreeMap::from([
            ("1".to_string(), "C".to_string()),
            ("2".to_string(), "C".to_string()),
            ("3".to_string(), "E".to_string()),
        ])),
        grader,
        template_path: Some(dir.path().join("form.png")),
        debug_path: None,
        report_path: None,
    };
    let report = job.run().unwrap();
    assert!(report.is_success());
    assert_eq!(report.result.unwrap().correct, 3);

    let missing = GradeJobConfig {
        template_path: Some(dir.path().join("no-form.png")),
        ..job
    };
    assert_eq!(missing.run().unwrap_err().kind(), ErrorKind::Io);
}
