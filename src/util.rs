use crate::param::reason_phrase;

pub struct HtmlBuilder {
    title: String,
    css: String,
    body: String,
}

impl HtmlBuilder {
    pub fn new(title: &str, body: String) -> Self {
        let css = r"
            body {
                width: 35em;
                margin: 0 auto;
                font-family: Tahoma, Verdana, Arial, sans-serif;
            }
            "
        .to_string();
        Self {
            title: escape_html(title),
            css,
            body,
        }
    }

    pub fn from_status_code(code: u16, note: Option<&str>) -> Self {
        let title = format!("{}", code);
        let description = match note {
            Some(n) => n,
            None => reason_phrase(code).unwrap_or("Unknown Status"),
        };
        let body = format!(
            r"
            <h1>{}</h1>
            <p>{}</p>
            ",
            code, description
        );
        Self::new(&title, body)
    }

    /// 追加一段 HTML 片段到页面主体末尾
    pub fn append(mut self, html: &str) -> Self {
        self.body.push_str(html);
        self
    }

    pub fn build(&self) -> String {
        format!(
            r##"<!DOCTYPE html>
            <html lang="en">
                <head>
                    <meta charset="utf-8">
                    <title>{}</title>
                    <style>{}</style>
                </head>
                <body>
                {}
                </body>
            </html>"##,
            self.title, self.css, self.body
        )
    }
}

/// 转义 HTML 特殊字符，错误消息等不可信文本写入页面前必须经过转义
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 取路径的父目录部分，语义与 POSIX `dirname` 一致（同时接受 `\` 分隔符）。
///
/// `/sub/index.php` -> `/sub`，`/index.php` -> `/`，`index.php` -> `.`
pub fn dirname(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return if path.is_empty() { "." } else { &path[..1] };
    }
    match trimmed.rfind(['/', '\\']) {
        Some(0) => &trimmed[..1],
        Some(index) => trimmed[..index].trim_end_matches(['/', '\\']),
        None => ".",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_builder_from_status_code() {
        let html = HtmlBuilder::from_status_code(404, Some("测试404")).build();
        assert!(html.contains("404"));
        assert!(html.contains("测试404"));
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("</html>"));
    }

    #[test]
    fn test_html_builder_from_status_code_no_note() {
        let html = HtmlBuilder::from_status_code(200, None).build();
        assert!(html.contains("200"));
        assert!(html.contains("OK"));
    }

    #[test]
    fn test_html_builder_unknown_status_code() {
        let html = HtmlBuilder::from_status_code(999, None).build();
        assert!(html.contains("Unknown Status"));
    }

    #[test]
    fn test_html_builder_structure() {
        let html = HtmlBuilder::new("标题", "<p>正文</p>".to_string())
            .append("<hr>")
            .build();

        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("<title>标题</title>"));
        assert!(html.contains("<p>正文</p><hr>"));
        assert!(html.contains("<style>"));
        assert!(html.contains("charset=\"utf-8\""));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#39;x&#39;) &amp; &quot;y&quot;&lt;/script&gt;"
        );
    }

    #[test]
    fn test_dirname() {
        assert_eq!(dirname("/subdir/index.php"), "/subdir");
        assert_eq!(dirname("/a/b/index.php"), "/a/b");
        assert_eq!(dirname("/index.php"), "/");
        assert_eq!(dirname("index.php"), ".");
        assert_eq!(dirname(""), ".");
        assert_eq!(dirname("/"), "/");
        assert_eq!(dirname("\\index.php"), "\\");
        assert_eq!(dirname("/subdir/"), "/");
    }
}
