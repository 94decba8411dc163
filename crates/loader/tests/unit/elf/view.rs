use pretty_assertions::assert_eq;
use tileload_core::common::ErrorKind;
use tileload_core::elf::ByteView;

#[test]
fn test_slice_inside() {
    let data = [0u8, 1, 2, 3, 4, 5, 6, 7];
    let view = ByteView::new(&data);
    let sub = view.slice(2, 4).unwrap();
    assert_eq!(sub.as_bytes(), &[2, 3, 4, 5]);
    assert_eq!(sub.base(), 2);
    assert_eq!(sub.len(), 4);
}

#[test]
fn test_nested_slice_keeps_absolute_base() {
    let data = [0u8; 32];
    let view = ByteView::new(&data);
    let inner = view.slice(8, 16).unwrap().slice(4, 4).unwrap();
    assert_eq!(inner.base(), 12);
}

#[test]
fn test_slice_past_end_is_invalid_binary() {
    let data = [0u8; 8];
    let view = ByteView::new(&data);
    let err = view.slice(4, 8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidBinary);
    assert!(err.to_string().contains("0x4..0xc"), "{err}");
}

#[test]
fn test_slice_overflowing_range() {
    let data = [0u8; 8];
    let err = ByteView::new(&data).slice(u64::MAX, 2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidBinary);
}

#[test]
fn test_empty_slice_at_end() {
    let data = [0u8; 8];
    let view = ByteView::new(&data).slice(8, 0).unwrap();
    assert!(view.is_empty());
}
