use std::sync::Arc;

use holedet::{
  detector::Detector,
  input::BlankInput,
  label::{LabelIndexing, LabelTable},
  model::{
    EfficientDetBuilder, Model, OutputSlots, RecordedFrame, ReplayInterpreter, TensorDump,
    decoder::BoxLayout, filter::ScoreThreshold,
  },
  output::{FrameRecord, JsonRecordOutput},
  task::{ContinuousTask, Task},
};
use tempfile::tempdir;

fn two_detection_dump() -> TensorDump {
  TensorDump {
    input_shape: vec![1, 4, 4, 3],
    frames: vec![
      RecordedFrame {
        // scores, locations, count, classes
        outputs: vec![
          vec![0.9, 0.1],
          vec![0.1, 0.2, 0.5, 0.6, 0.0, 0.0, 0.0, 0.0],
          vec![2.0],
          vec![0.0, 1.0],
        ],
      },
      RecordedFrame {
        outputs: vec![
          vec![0.4, 0.7],
          vec![0.0, 0.0, 0.0, 0.0, 0.2, 0.3, 0.4, 0.5],
          vec![2.0],
          vec![1.0, 0.0],
        ],
      },
    ],
  }
}

#[test]
fn replayed_tensors_flow_through_to_json_records() {
  let dir = tempdir().unwrap();
  let dump_path = dir.path().join("dump.json");
  std::fs::write(
    &dump_path,
    serde_json::to_string(&two_detection_dump()).unwrap(),
  )
  .unwrap();
  let labels_path = dir.path().join("labels.txt");
  std::fs::write(&labels_path, "hole\r\nscrew\n\n").unwrap();

  let labels = Arc::new(LabelTable::load(&labels_path));
  let interpreter = ReplayInterpreter::open(&dump_path).unwrap();
  let model = EfficientDetBuilder::new("hole.tflite")
    .max_detections(2)
    .build(interpreter, labels)
    .unwrap();
  let (height, width) = (model.input_height(), model.input_width());
  assert_eq!((height, width), (4, 4));

  let out_path = dir.path().join("holes.json");
  ContinuousTask::default()
    .run_task(
      BlankInput::new(2).into_nhwc(height, width),
      Detector::new(model, ScoreThreshold::default()),
      JsonRecordOutput::new(&out_path),
    )
    .unwrap();

  let first: FrameRecord =
    serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
  assert_eq!(first.detections.len(), 1);
  let hole = &first.detections[0];
  assert_eq!(hole.label, "hole");
  assert!((hole.bbox.x - 0.2).abs() < 1e-6);
  assert!((hole.bbox.y - 0.9).abs() < 1e-6);
  assert!((hole.bbox.width - 0.4).abs() < 1e-6);
  assert!((hole.bbox.height - 0.4).abs() < 1e-6);

  let second: FrameRecord = serde_json::from_str(
    &std::fs::read_to_string(dir.path().join("holes-0002.json")).unwrap(),
  )
  .unwrap();
  assert_eq!(second.detections.len(), 1);
  assert_eq!(second.detections[0].label, "hole");
  assert!((second.detections[0].score - 0.7).abs() < 1e-6);
}

#[test]
fn alternative_export_conventions_are_configurable() {
  // locations=0, classes=1, scores=2, no count, pre-inverted boxes, background label at 0
  let dump = TensorDump {
    input_shape: vec![1, 2, 2, 3],
    frames: vec![RecordedFrame {
      outputs: vec![
        vec![0.9, 0.2, 0.5, 0.6, 0.0, 0.0, 0.0, 0.0],
        vec![0.0, 5.0],
        vec![0.8, 0.9],
      ],
    }],
  };
  let labels = Arc::new(LabelTable::from_text(Some("???\nhole")));
  let mut model = EfficientDetBuilder::new("ssd.tflite")
    .max_detections(2)
    .layout(BoxLayout::TopLeftBottomRight)
    .label_indexing(LabelIndexing::BackgroundOffset)
    .slots(OutputSlots {
      locations: 0,
      classes: 1,
      scores: 2,
      num_detections: None,
    })
    .build(ReplayInterpreter::from(dump), labels)
    .unwrap();

  let frame = BlankInput::new(1).into_nhwc(2, 2).next().unwrap();
  let result = model.infer(&frame).unwrap();
  assert_eq!(result.len(), 2);
  assert_eq!(result.items[0].label, "hole");
  assert_eq!(result.items[1].label, "?");
  assert_eq!(result.items[1].class_index, 5);
  let bbox = result.items[0].bbox;
  assert!((bbox.y - 0.9).abs() < 1e-6);
  assert!((bbox.height - 0.4).abs() < 1e-6);
}
