use std::io::Cursor;
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
use sketch_import::{
    ClipboardBridge, ClipboardItem, CropSelection, DropPayload, DropzoneState, ElementRect,
    ImageSource, ImportConfig, ImportCoordinator, IngestOutcome, PasteEvent, PasteMode,
    PointerPosition, SurfaceCommand, TargetDropOutcome,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};

fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgba([(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8, 255])
    });

    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("failed to encode test image");
    cursor.into_inner()
}

fn png(width: u32, height: u32) -> ImageSource {
    ImageSource::blob(create_png_bytes(width, height), "image/png")
}

fn target_rect() -> ElementRect {
    ElementRect::new(40.0, 60.0, 1024.0, 768.0)
}

fn session() -> (
    ImportCoordinator<mpsc::UnboundedSender<SurfaceCommand>>,
    UnboundedReceiver<SurfaceCommand>,
) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let coordinator = ImportCoordinator::new(ImportConfig::default(), PasteMode::EventData, sender)
        .expect("default config is valid");
    (coordinator, receiver)
}

fn placements(receiver: &mut UnboundedReceiver<SurfaceCommand>) -> Vec<sketch_import::PlacementEvent> {
    let mut placed = Vec::new();
    while let Ok(command) = receiver.try_recv() {
        if let SurfaceCommand::Place(event) = command {
            placed.push(event);
        }
    }
    placed
}

#[tokio::test]
async fn file_dropped_on_target_bypasses_staging() {
    let (coordinator, mut receiver) = session();

    let outcome = coordinator
        .drop_on_target(DropPayload::new(
            PointerPosition::new(90.0, 90.0),
            target_rect(),
            vec![png(200, 150)],
        ))
        .await
        .expect("drop");

    assert!(matches!(outcome, TargetDropOutcome::Placed(_)));
    let placed = placements(&mut receiver);
    assert_eq!(placed.len(), 1);
    assert_eq!((placed[0].x, placed[0].y), (50.0, 30.0));
    assert_eq!(placed[0].image.dimensions(), (200, 150));
    assert_eq!(coordinator.view().expect("view").state, DropzoneState::Empty);
}

#[tokio::test]
async fn staged_image_can_be_cropped() {
    let (coordinator, _receiver) = session();

    let outcome = coordinator
        .drop_on_dropzone(DropPayload::new(
            PointerPosition::default(),
            ElementRect::default(),
            vec![png(200, 150)],
        ))
        .await
        .expect("drop");
    let IngestOutcome::Staged(original) = outcome else {
        panic!("expected staged image, got {outcome:?}");
    };
    assert_eq!(coordinator.view().expect("view").state, DropzoneState::Staged);

    coordinator.enter_crop().expect("enter crop");
    assert_eq!(coordinator.view().expect("view").state, DropzoneState::Cropping);
    coordinator
        .adjust_crop(CropSelection::new(10, 10, 100, 80))
        .expect("adjust crop");
    coordinator.confirm_crop().expect("confirm crop");

    let view = coordinator.view().expect("view");
    assert_eq!(view.state, DropzoneState::Staged);
    assert_eq!((view.image_width, view.image_height), (Some(100), Some(80)));
    assert_eq!(view.selection, None);
    assert_ne!(view.image_id, Some(original.id()));
}

#[tokio::test]
async fn non_image_paste_delivers_none_and_keeps_state() {
    let (sender, _receiver) = mpsc::unbounded_channel();
    let config = ImportConfig::default();
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);
    let bridge = ClipboardBridge::init(PasteMode::EventData, &config)
        .with_handler(move |image| sink.lock().expect("handler lock").push(image));
    let coordinator =
        ImportCoordinator::with_clipboard(config, bridge, sender).expect("default config is valid");

    coordinator
        .drop_on_dropzone(DropPayload::new(
            PointerPosition::default(),
            ElementRect::default(),
            vec![png(20, 20)],
        ))
        .await
        .expect("drop");
    let before = coordinator.view().expect("view");

    let outcome = coordinator
        .paste(&PasteEvent::EventData {
            files: Vec::new(),
            items: vec![ClipboardItem::Text {
                media_type: "text/html".to_string(),
                text: "<b>hello</b>".to_string(),
            }],
        })
        .await
        .expect("paste");

    assert!(matches!(outcome.ingest, IngestOutcome::Rejected(_)));
    assert!(outcome.prevent_default);
    assert_eq!(*delivered.lock().expect("lock"), vec![None]);
    assert_eq!(coordinator.view().expect("view"), before);
}

#[tokio::test]
async fn pasted_image_is_staged_not_placed() {
    let (coordinator, mut receiver) = session();

    let outcome = coordinator
        .paste(&PasteEvent::EventData {
            files: vec![ClipboardItem::File {
                media_type: "image/png".to_string(),
                bytes: create_png_bytes(32, 16).into(),
            }],
            items: Vec::new(),
        })
        .await
        .expect("paste");

    assert!(matches!(outcome.ingest, IngestOutcome::Staged(_)));
    assert_eq!(coordinator.view().expect("view").state, DropzoneState::Staged);
    assert!(placements(&mut receiver).is_empty());
}

async fn stage(
    coordinator: &ImportCoordinator<mpsc::UnboundedSender<SurfaceCommand>>,
    source: ImageSource,
) -> IngestOutcome {
    coordinator
        .drop_on_dropzone(DropPayload::new(
            PointerPosition::default(),
            ElementRect::default(),
            vec![source],
        ))
        .await
        .expect("drop")
}

#[tokio::test]
async fn slower_earlier_decode_does_not_overwrite_newer_image() {
    let (coordinator, _receiver) = session();

    let (first, second) = tokio::join!(
        stage(&coordinator, png(1200, 900)),
        stage(&coordinator, png(30, 20))
    );

    assert!(matches!(first, IngestOutcome::Stale(_)));
    assert!(matches!(second, IngestOutcome::Staged(_)));
    let view = coordinator.view().expect("view");
    assert_eq!((view.image_width, view.image_height), (Some(30), Some(20)));
}

#[tokio::test]
async fn drag_off_places_image_under_grab_point() {
    let (coordinator, mut receiver) = session();
    coordinator
        .drop_on_dropzone(DropPayload::new(
            PointerPosition::default(),
            ElementRect::default(),
            vec![png(64, 48)],
        ))
        .await
        .expect("drop");

    // 暂存图片显示在视口 (700, 20)，抓在 (12, 8)
    coordinator
        .begin_drag_off(
            PointerPosition::new(712.0, 28.0),
            ElementRect::new(700.0, 20.0, 64.0, 48.0),
        )
        .expect("drag off");
    coordinator
        .drop_on_target(DropPayload::new(
            PointerPosition::new(340.0, 260.0),
            target_rect(),
            Vec::new(),
        ))
        .await
        .expect("drop on target");

    let placed = placements(&mut receiver);
    assert_eq!(placed.len(), 1);
    // (340 - 40 - 12, 260 - 60 - 8)
    assert_eq!((placed[0].x, placed[0].y), (288.0, 192.0));
    assert_eq!(coordinator.view().expect("view").state, DropzoneState::Empty);
}

#[tokio::test]
async fn abandoned_drag_off_falls_back_to_file_drop() {
    let (coordinator, mut receiver) = session();
    coordinator
        .drop_on_dropzone(DropPayload::new(
            PointerPosition::default(),
            ElementRect::default(),
            vec![png(10, 10)],
        ))
        .await
        .expect("drop");
    coordinator
        .begin_drag_off(PointerPosition::new(5.0, 5.0), ElementRect::new(0.0, 0.0, 10.0, 10.0))
        .expect("drag off");
    coordinator.end_drag_off().expect("drag end");

    coordinator
        .drop_on_target(DropPayload::new(
            PointerPosition::new(140.0, 160.0),
            target_rect(),
            vec![png(7, 9)],
        ))
        .await
        .expect("drop on target");

    let placed = placements(&mut receiver);
    assert_eq!(placed.len(), 1);
    assert_eq!((placed[0].x, placed[0].y), (100.0, 100.0));
    assert_eq!(placed[0].image.dimensions(), (7, 9));
    assert_eq!(coordinator.view().expect("view").state, DropzoneState::Staged);
}
