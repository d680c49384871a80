// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 内置拦截器
//!
//! - `Stopwatch`：请求进入时写入 `start_time` 属性，响应返回时附加 `end_time` 头并记录耗时；
//! - `Compression`：按客户端的 `Accept-Encoding` 压缩响应体（gzip、deflate、br）。
//!
//! 二者都可以在配置文件中按名称启用，见 `Component::named`。

use std::io::{self, Write};

use brotli::enc::{self, backward_references::BrotliEncoderParams};
use chrono::{DateTime, SecondsFormat, Utc};
use flate2::{
    write::{DeflateEncoder, GzEncoder},
    Compression as Level,
};
use log::{debug, error, info};

use crate::{
    exception::Exception,
    param::HttpEncoding,
    pipeline::{Interceptor, Next},
    request::Request,
    response::Response,
};

pub const ATTR_START_TIME: &str = "start_time";
pub const HEADER_END_TIME: &str = "end_time";

/// 计时拦截器
#[derive(Debug, Clone, Copy, Default)]
pub struct Stopwatch;

impl Interceptor for Stopwatch {
    fn process(&self, request: Request, next: &mut dyn Next) -> Result<Response, Exception> {
        let start: DateTime<Utc> = Utc::now();
        let method = request.method();
        let path = request.path().to_string();

        let response = next.handle(request.with_attribute(ATTR_START_TIME, start))?;

        let end = Utc::now();
        let elapsed = end - start;
        info!(
            "{} {} -> {}，耗时 {}μs",
            method,
            path,
            response.status_code(),
            elapsed.num_microseconds().unwrap_or(i64::MAX)
        );
        Ok(response.with_header(
            HEADER_END_TIME,
            &end.to_rfc3339_opts(SecondsFormat::Micros, true),
        ))
    }
}

/// 响应压缩拦截器
#[derive(Debug, Clone, Copy, Default)]
pub struct Compression;

impl Interceptor for Compression {
    fn process(&self, request: Request, next: &mut dyn Next) -> Result<Response, Exception> {
        let accept_encoding = request.accept_encoding();
        let response = next.handle(request)?;

        if response.body().is_empty() || response.header("Content-Encoding").is_some() {
            return Ok(response);
        }
        let mime = response
            .header("Content-Type")
            .unwrap_or("application/octet-stream");
        if should_skip_compression(mime) {
            debug!("{} 类型无需压缩", mime);
            return Ok(response);
        }
        let encoding = match decide_encoding(&accept_encoding) {
            Some(e) => e,
            None => return Ok(response),
        };

        match compress(response.body().to_vec(), encoding) {
            Ok(data) => Ok(response
                .with_header("Content-Encoding", &encoding.to_string())
                .with_header("Vary", "Accept-Encoding")
                .with_body(data)),
            Err(e) => {
                error!("压缩响应体失败，按原样返回：{}", e);
                Ok(response)
            }
        }
    }
}

fn compress(data: Vec<u8>, mode: HttpEncoding) -> io::Result<Vec<u8>> {
    let original_size = data.len();
    let result = match mode {
        HttpEncoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Level::default());
            encoder.write_all(&data)?;
            encoder.finish()
        }
        HttpEncoding::Deflate => {
            let mut encoder = DeflateEncoder::new(Vec::new(), Level::default());
            encoder.write_all(&data)?;
            encoder.finish()
        }
        HttpEncoding::Br => {
            let params = BrotliEncoderParams::default();
            let mut output = Vec::new();
            enc::BrotliCompress(&mut io::Cursor::new(data), &mut output, &params)?;
            Ok(output)
        }
    };

    if let Ok(ref compressed) = result {
        debug!(
            "压缩完成: {}, 原始大小: {} bytes, 压缩后: {} bytes",
            mode,
            original_size,
            compressed.len()
        );
    }
    result
}

fn should_skip_compression(mime_type: &str) -> bool {
    let skip_types = [
        "image/",
        "video/",
        "audio/",
        "application/zip",
        "application/gzip",
        "application/x-gzip",
        "font/woff",
    ];
    skip_types
        .iter()
        .any(|&skip_type| mime_type.starts_with(skip_type))
}

/// `accept_encoding` 已按 q 值与偏好排序，取第一个即可
fn decide_encoding(accept_encoding: &[HttpEncoding]) -> Option<HttpEncoding> {
    accept_encoding.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{param::HttpRequestMethod, pipeline::Runner};
    use flate2::read::GzDecoder;
    use std::{io::Read, sync::Arc};

    fn run_with(
        interceptor: Arc<dyn Interceptor>,
        request: Request,
        terminal: &dyn Fn(Request) -> Result<Response, Exception>,
    ) -> Result<Response, Exception> {
        let queue = vec![interceptor];
        let mut runner = Runner::new(&queue, terminal);
        runner.handle(request)
    }

    #[test]
    fn test_stopwatch_sets_start_and_end() {
        let terminal = |request: Request| -> Result<Response, Exception> {
            assert!(request.attribute::<DateTime<Utc>>(ATTR_START_TIME).is_some());
            Ok(Response::text("ok"))
        };
        let response = run_with(
            Arc::new(Stopwatch),
            Request::new(HttpRequestMethod::Get, "/"),
            &terminal,
        )
        .unwrap();

        let end = response.header(HEADER_END_TIME).unwrap();
        assert!(DateTime::parse_from_rfc3339(end).is_ok());
    }

    #[test]
    fn test_stopwatch_propagates_failure() {
        let terminal = |_request: Request| -> Result<Response, Exception> {
            Err(Exception::failure(503, "down"))
        };
        let result = run_with(
            Arc::new(Stopwatch),
            Request::new(HttpRequestMethod::Get, "/"),
            &terminal,
        );
        assert_eq!(result.unwrap_err(), Exception::failure(503, "down"));
    }

    #[test]
    fn test_compression_gzip() {
        let body = "hello ".repeat(200);
        let expected = body.clone();
        let terminal =
            move |_request: Request| -> Result<Response, Exception> { Ok(Response::text(body.clone())) };
        let request = Request::new(HttpRequestMethod::Get, "/")
            .with_header("Accept-Encoding", "gzip, deflate, br");

        let response = run_with(Arc::new(Compression), request, &terminal).unwrap();

        assert_eq!(response.header("content-encoding"), Some("gzip"));
        assert!(response.content_length() < expected.len());
        let mut decoded = String::new();
        GzDecoder::new(response.body()).read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_compression_brotli_only() {
        let terminal = |_request: Request| -> Result<Response, Exception> {
            Ok(Response::html("<p>brotli</p>".repeat(50)))
        };
        let request =
            Request::new(HttpRequestMethod::Get, "/").with_header("Accept-Encoding", "br");

        let response = run_with(Arc::new(Compression), request, &terminal).unwrap();

        assert_eq!(response.header("Content-Encoding"), Some("br"));
        let mut decoded = Vec::new();
        brotli::BrotliDecompress(&mut io::Cursor::new(response.body()), &mut decoded).unwrap();
        assert_eq!(decoded, "<p>brotli</p>".repeat(50).into_bytes());
    }

    #[test]
    fn test_compression_skipped() {
        let terminal = |_request: Request| -> Result<Response, Exception> {
            Ok(Response::new()
                .with_header("Content-Type", "image/png")
                .with_body(vec![1u8; 64]))
        };

        let plain = run_with(
            Arc::new(Compression),
            Request::new(HttpRequestMethod::Get, "/"),
            &terminal,
        )
        .unwrap();
        assert_eq!(plain.header("Content-Encoding"), None);

        let image = run_with(
            Arc::new(Compression),
            Request::new(HttpRequestMethod::Get, "/").with_header("Accept-Encoding", "gzip"),
            &terminal,
        )
        .unwrap();
        assert_eq!(image.header("Content-Encoding"), None);
        assert_eq!(image.body(), &[1u8; 64][..]);
    }

    #[test]
    fn test_compression_respects_rejected_encoding() {
        let terminal = |_request: Request| -> Result<Response, Exception> {
            Ok(Response::text("refused ".repeat(100)))
        };

        let request = Request::new(HttpRequestMethod::Get, "/")
            .with_header("Accept-Encoding", "gzip;q=0, br");
        let response = run_with(Arc::new(Compression), request, &terminal).unwrap();
        assert_eq!(response.header("Content-Encoding"), Some("br"));

        let request =
            Request::new(HttpRequestMethod::Get, "/").with_header("Accept-Encoding", "gzip;q=0");
        let response = run_with(Arc::new(Compression), request, &terminal).unwrap();
        assert_eq!(response.header("Content-Encoding"), None);
        assert_eq!(response.body(), "refused ".repeat(100).as_bytes());
    }

    #[test]
    fn test_compression_prefers_higher_quality() {
        let terminal = |_request: Request| -> Result<Response, Exception> {
            Ok(Response::text("weighted ".repeat(100)))
        };
        let request = Request::new(HttpRequestMethod::Get, "/")
            .with_header("Accept-Encoding", "gzip;q=0.5, deflate;q=0.9");
        let response = run_with(Arc::new(Compression), request, &terminal).unwrap();
        assert_eq!(response.header("Content-Encoding"), Some("deflate"));
    }

    #[test]
    fn test_decide_encoding_takes_first() {
        assert_eq!(
            decide_encoding(&[HttpEncoding::Br, HttpEncoding::Gzip]),
            Some(HttpEncoding::Br)
        );
        assert_eq!(decide_encoding(&[HttpEncoding::Deflate]), Some(HttpEncoding::Deflate));
        assert_eq!(decide_encoding(&[]), None);
    }
}
