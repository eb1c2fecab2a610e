use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

use crate::error::Result;
use crate::records::{ClassifiedRecord, MergedRecord, SubtitleRecord, VideoRecord};

/// Written first so spreadsheet tools detect UTF-8
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const BASE_COLUMNS: [&str; 9] = [
    "video_id", "URL", "title", "duration", "views", "date", "likes", "comments", "subtitles",
];

/// Writes pipeline tables as UTF-8 CSV with a byte order mark
#[derive(Debug, Clone)]
pub struct CsvExporter {
    output_dir: PathBuf,
    watch_base_url: String,
}

impl CsvExporter {
    pub fn new(output_dir: impl Into<PathBuf>, watch_base_url: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            watch_base_url: watch_base_url.into(),
        }
    }

    fn open(&self, file_name: &str) -> Result<(PathBuf, csv::Writer<BufWriter<File>>)> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file_name);
        let mut file = BufWriter::new(File::create(&path)?);
        file.write_all(UTF8_BOM)?;
        Ok((path, csv::Writer::from_writer(file)))
    }

    /// Cells shared by the merged and classified tables; absent sides are blank
    fn base_cells(&self, merged: &MergedRecord) -> Vec<String> {
        let video = merged.video.as_ref();
        let subtitles = merged.subtitles.as_ref();
        let number = |f: fn(&VideoRecord) -> u64| video.map(|v| f(v).to_string()).unwrap_or_default();

        vec![
            merged.id.to_string(),
            format!("{}{}", self.watch_base_url, merged.id),
            video.map(|v| v.title.clone()).unwrap_or_default(),
            number(|v| v.duration_seconds),
            number(|v| v.views),
            video.map(|v| v.published_date.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            number(|v| v.likes),
            number(|v| v.comments),
            subtitles.map(|s: &SubtitleRecord| s.text.clone()).unwrap_or_default(),
        ]
    }

    /// Final table: base columns, `<cat>_count` and `<cat>_per_min` per
    /// category in `categories` order, then `primary_category`
    pub fn write_classified(
        &self,
        file_name: &str,
        categories: &[String],
        records: &[ClassifiedRecord],
    ) -> Result<PathBuf> {
        let (path, mut writer) = self.open(file_name)?;

        let mut header: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
        for name in categories {
            header.push(format!("{}_count", name));
            header.push(format!("{}_per_min", name));
        }
        header.push("primary_category".to_string());
        writer.write_record(&header)?;

        for record in records {
            let mut row = self.base_cells(&record.merged);
            for name in categories {
                match record.scores.get(name) {
                    Some(score) => {
                        row.push(score.count.to_string());
                        row.push(score.per_minute.to_string());
                    }
                    None => {
                        row.push(String::new());
                        row.push(String::new());
                    }
                }
            }
            row.push(record.primary_category.clone());
            writer.write_record(&row)?;
        }

        writer.flush()?;
        info!("💾 Wrote {} rows to {}", records.len(), path.display());
        Ok(path)
    }

    /// Merged table before scoring, for debugging the join
    pub fn write_merged(&self, file_name: &str, records: &[MergedRecord]) -> Result<PathBuf> {
        let (path, mut writer) = self.open(file_name)?;
        writer.write_record(BASE_COLUMNS)?;
        for record in records {
            writer.write_record(self.base_cells(record))?;
        }
        writer.flush()?;
        info!("🐛 Debug merge written to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::{CategoryScore, ScoreRow};
    use crate::records::VideoId;
    use chrono::NaiveDate;
    use std::path::Path;

    fn video(id: &str) -> VideoRecord {
        VideoRecord {
            id: VideoId::from(id),
            title: "医師の話, part 1".to_string(),
            published_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            duration_seconds: 120,
            views: 5,
            likes: 1,
            comments: 0,
        }
    }

    fn read(path: &Path) -> String {
        let bytes = fs::read(path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap()
    }

    #[test]
    fn test_write_classified() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path().join("out"), "https://www.youtube.com/watch?v=");

        let record = ClassifiedRecord {
            merged: MergedRecord {
                id: VideoId::from("abc"),
                video: Some(video("abc")),
                subtitles: None,
            },
            scores: ScoreRow {
                scores: vec![CategoryScore {
                    name: "medical".into(),
                    count: 3,
                    per_minute: 1.5,
                }],
            },
            primary_category: "medical".into(),
        };

        let path = exporter
            .write_classified("result.csv", &["medical".to_string()], &[record])
            .unwrap();
        let content = read(&path);
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(
            lines[0],
            "video_id,URL,title,duration,views,date,likes,comments,subtitles,medical_count,medical_per_min,primary_category"
        );
        assert_eq!(
            lines[1],
            "abc,https://www.youtube.com/watch?v=abc,\"医師の話, part 1\",120,5,2024-01-02,1,0,,3,1.5,medical"
        );
    }

    #[test]
    fn test_write_merged_subtitle_only_row() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path(), "https://youtu.be/");

        let records = vec![MergedRecord {
            id: VideoId::from("xyz"),
            video: None,
            subtitles: Some(SubtitleRecord {
                id: VideoId::from("xyz"),
                text: "line one\nline two".into(),
            }),
        }];

        let path = exporter.write_merged("debug.csv", &records).unwrap();
        let content = read(&path);
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let row = reader.records().next().unwrap().unwrap();

        assert_eq!(&row[0], "xyz");
        assert_eq!(&row[1], "https://youtu.be/xyz");
        assert_eq!(&row[2], "");
        assert_eq!(&row[3], "");
        assert_eq!(&row[8], "line one\nline two");
    }
}
