use std::ffi::CString;
use std::os::raw::c_int;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ocrlite::*;

static SLOT: Mutex<()> = Mutex::new(());

fn lock() -> MutexGuard<'static, ()> {
    SLOT.lock().unwrap_or_else(PoisonError::into_inner)
}

fn c_str(s: &str) -> CString {
    CString::new(s).unwrap()
}

#[test]
fn detect_before_init_fails() {
    let _slot = lock();
    ocr_cleanup();

    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("scan.png");
    std::fs::write(&image, b"x").unwrap();
    let image = c_str(image.to_str().unwrap());

    let mut buf = vec![0u8; 256];
    let mut len = buf.len() as c_int;
    let status = unsafe { ocr_detect2(image.as_ptr(), buf.as_mut_ptr().cast(), &mut len) };
    assert_eq!(status, K_OCR_ERROR);
    assert_eq!(len, 256);
    assert_eq!(ocr_last_result_len(), 0);
}

#[test]
fn init_with_missing_files_fails() {
    let _slot = lock();
    ocr_cleanup();

    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("keys.txt");
    std::fs::write(&present, "a\nb\n").unwrap();
    let present = c_str(present.to_str().unwrap());
    let missing = c_str(dir.path().join("dbnet.onnx").to_str().unwrap());

    let status = unsafe {
        ocr_init(
            2,
            missing.as_ptr(),
            present.as_ptr(),
            present.as_ptr(),
            present.as_ptr(),
        )
    };
    assert_eq!(status, K_OCR_ERROR);

    let status = unsafe {
        ocr_init(
            2,
            present.as_ptr(),
            present.as_ptr(),
            present.as_ptr(),
            missing.as_ptr(),
        )
    };
    assert_eq!(status, K_OCR_ERROR);
}

#[test]
fn null_pointers_fail() {
    let _slot = lock();
    let image = c_str("scan.png");
    let mut buf = vec![0u8; 16];
    let mut len = buf.len() as c_int;

    unsafe {
        assert_eq!(
            ocr_init(
                1,
                std::ptr::null(),
                std::ptr::null(),
                std::ptr::null(),
                std::ptr::null()
            ),
            K_OCR_ERROR
        );
        assert_eq!(
            ocr_detect2(std::ptr::null(), buf.as_mut_ptr().cast(), &mut len),
            K_OCR_ERROR
        );
        assert_eq!(
            ocr_detect2(image.as_ptr(), std::ptr::null_mut(), &mut len),
            K_OCR_ERROR
        );
        assert_eq!(
            ocr_detect2(image.as_ptr(), buf.as_mut_ptr().cast(), std::ptr::null_mut()),
            K_OCR_ERROR
        );
    }
    assert_eq!(len, 16);
}

#[test]
fn cleanup_is_repeatable() {
    let _slot = lock();
    ocr_cleanup();
    ocr_cleanup();
    assert_eq!(ocr_last_result_len(), 0);
}

#[test]
fn header_matches_exported_constants() {
    let header = include_str!("../include/ocr.h");
    let define = |name: &str| -> String {
        header
            .lines()
            .find_map(|line| line.strip_prefix(&format!("#define {} ", name)))
            .unwrap_or_else(|| panic!("{} not defined", name))
            .trim()
            .trim_end_matches('f')
            .to_string()
    };

    assert_eq!(define("kOcrError"), K_OCR_ERROR.to_string());
    assert_eq!(define("kOcrSuccess"), K_OCR_SUCCESS.to_string());
    assert_eq!(define("kDefaultPadding"), DEFAULT_PADDING.to_string());
    assert_eq!(define("kDefaultMaxSideLen"), DEFAULT_MAX_SIDE_LEN.to_string());
    assert_eq!(
        define("kDefaultBoxScoreThresh").parse::<f32>().unwrap(),
        DEFAULT_BOX_SCORE_THRESH
    );
    assert_eq!(
        define("kDefaultBoxThresh").parse::<f32>().unwrap(),
        DEFAULT_BOX_THRESH
    );
    assert_eq!(
        define("kDefaultUnClipRatio").parse::<f32>().unwrap(),
        DEFAULT_UN_CLIP_RATIO
    );
    assert_eq!(define("kDefaultDoAngle"), DEFAULT_DO_ANGLE.to_string());
    assert_eq!(define("kDefaultMostAngle"), DEFAULT_MOST_ANGLE.to_string());
}
