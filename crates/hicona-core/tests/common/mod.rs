#![allow(dead_code)]

use std::path::{Path, PathBuf};

use image::{ImageBuffer, Luma};

/// Deterministic fill value for one tile, so reshapes can be traced back
/// to their source file.
pub fn tile_value(field: u32, plane: u32, channel: u32, timepoint: u32) -> u16 {
    (field * 1000 + plane * 100 + channel * 10 + timepoint) as u16
}

/// Archive-flavor tile name: `r01c01f03p02-ch01t01.tiff`.
pub fn tile_name(row: u32, col: u32, field: u32, plane: u32, channel: u32, timepoint: u32) -> String {
    format!("r{row:02}c{col:02}f{field:02}p{plane:02}-ch{channel:02}t{timepoint:02}.tiff")
}

/// Write a constant-valued 16-bit grayscale TIFF tile.
pub fn write_tile(path: &Path, width: u32, height: u32, value: u16) {
    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_pixel(width, height, Luma([value]));
    img.save(path).expect("write tile");
}

/// A `*.kw.txt` document: one header line, the JSON body, two footer lines.
pub fn kw_text(plate: &str, planes: usize, timepoints: usize, fields: usize, channels: usize) -> String {
    let channel_json: Vec<String> = (1..=channels).map(|c| format!("\"Channel {c}\"")).collect();
    let channel_value = if channels == 1 {
        "\"Channel 1\"".to_string()
    } else {
        format!("[{}]", channel_json.join(", "))
    };
    format!(
        "Database Rev: 42\n\
         {{\n\
           \"PLATENAME\": \"{plate}\",\n\
           \"PLANES\": {planes},\n\
           \"TIMEPOINTS\": {timepoints},\n\
           \"FIELDS\": {fields},\n\
           \"CHANNEL\": {channel_value},\n\
           \"MEASUREMENT\": \"Measurement 1\",\n\
           \"GUID\": \"d3d31154-c106-4002-a94c-82d30ba740e3\"\n\
         }}\n\
         OK\n\
         END\n"
    )
}

/// Index XML with one camera, one exposure, one sublayout of two fields
/// and one well (r04c05).
pub const INDEX_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<EvaluationInputData xmlns="http://www.perkinelmer.com/PEHH/HarmonyV5" Version="1">
  <InstrumentDescription>
    <Cameras>
      <Camera>
        <PixelSizeX>6.5E-06</PixelSizeX>
      </Camera>
    </Cameras>
  </InstrumentDescription>
  <Experiment>
    <Exposures>
      <Exposure>
        <ObjectiveMagnification>20</ObjectiveMagnification>
        <SimpleChannel>
          <CameraSetting>
            <BinningX>2</BinningX>
          </CameraSetting>
        </SimpleChannel>
      </Exposure>
    </Exposures>
    <Sublayouts>
      <Sublayout>
        <Field>
          <X>0.00065</X>
          <Y>0.000325</Y>
        </Field>
        <Field>
          <X>0.0013</X>
          <Y>-0.000325</Y>
        </Field>
      </Sublayout>
    </Sublayouts>
    <MeasurementLayout>
      <Wells>
        <Well>
          <Row>4</Row>
          <Col>5</Col>
          <SublayoutID>1</SublayoutID>
        </Well>
      </Wells>
    </MeasurementLayout>
  </Experiment>
  <Sequence>
    <Record>
      <Channel>DAPI</Channel>
    </Record>
    <Record>
      <Channel>GFP</Channel>
    </Record>
  </Sequence>
</EvaluationInputData>
"#;

/// Parameters for a synthetic measurement directory.
pub struct MeasurementSpec {
    pub plate: String,
    pub wells: Vec<(u32, u32)>,
    pub fields: u32,
    pub planes: u32,
    pub channels: u32,
    pub timepoints: u32,
    pub tile_size: u32,
    pub with_index_xml: bool,
}

impl Default for MeasurementSpec {
    fn default() -> Self {
        Self {
            plate: "TestPlate".into(),
            wells: vec![(1, 1)],
            fields: 2,
            planes: 2,
            channels: 2,
            timepoints: 1,
            tile_size: 8,
            with_index_xml: false,
        }
    }
}

/// Build a complete measurement tree (kw.txt, images/, per-well tile dirs)
/// under `root` and return its path.
pub fn build_measurement(root: &Path, spec: &MeasurementSpec) -> PathBuf {
    let dir = root.join("d3d31154-c106-4002-a94c-82d30ba740e3");
    let images = dir.join("images");
    std::fs::create_dir_all(&images).expect("create images dir");

    std::fs::write(
        dir.join("d3d31154-c106-4002.kw.txt"),
        kw_text(
            &spec.plate,
            spec.planes as usize,
            spec.timepoints as usize,
            spec.fields as usize,
            spec.channels as usize,
        ),
    )
    .expect("write kw.txt");

    if spec.with_index_xml {
        std::fs::write(dir.join("d3d31154-c106-4002.xml"), INDEX_XML).expect("write index xml");
    }

    for &(row, col) in &spec.wells {
        let well_dir = images.join(format!("r{row:02}c{col:02}"));
        std::fs::create_dir_all(&well_dir).expect("create well dir");
        for field in 1..=spec.fields {
            for timepoint in 1..=spec.timepoints {
                for plane in 1..=spec.planes {
                    for channel in 1..=spec.channels {
                        let name = tile_name(row, col, field, plane, channel, timepoint);
                        write_tile(
                            &well_dir.join(name),
                            spec.tile_size,
                            spec.tile_size,
                            tile_value(field, plane, channel, timepoint),
                        );
                    }
                }
            }
        }
    }

    dir
}
