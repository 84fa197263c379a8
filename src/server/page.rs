//! The upload page served at `/`.

use html_escape::encode_text;

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Scan to DOCX</title>
<style>
body { font-family: sans-serif; max-width: 40rem; margin: 2rem auto; }
#paste-preview { max-width: 100%; display: none; margin-top: .5rem; }
</style>
</head>
<body>
<h1>Scan to DOCX</h1>
<form method="post" action="/" enctype="multipart/form-data">
  <p><input type="file" name="file" accept=".pdf,.png,.jpg,.jpeg"></p>
  <p>or paste an image anywhere on this page</p>
  <input type="hidden" name="pasted_image" id="pasted_image">
  <img id="paste-preview" alt="">
  <p><label><input type="checkbox" name="use_ai"> Correct text with AI</label></p>
  <p><button type="submit">Convert</button></p>
</form>
"#;

const TAIL: &str = r#"<script>
document.addEventListener('paste', function (e) {
  for (const item of e.clipboardData.items) {
    if (!item.type.startsWith('image/')) continue;
    const reader = new FileReader();
    reader.onload = function () {
      document.getElementById('pasted_image').value = reader.result;
      const img = document.getElementById('paste-preview');
      img.src = reader.result;
      img.style.display = 'block';
    };
    reader.readAsDataURL(item.getAsFile());
  }
});
</script>
</body>
</html>
"#;

/// Render the page with links to the given converted files.
pub fn render_index(recent: &[String]) -> String {
    let mut html = String::from(HEAD);
    html.push_str("<h2>Recently converted</h2>\n");
    if recent.is_empty() {
        html.push_str("<p>Nothing converted yet.</p>\n");
    } else {
        html.push_str("<ul>\n");
        for name in recent {
            html.push_str(&format!(
                "  <li><a href=\"/download/{}\">{}</a></li>\n",
                urlencoding::encode(name),
                encode_text(name)
            ));
        }
        html.push_str("</ul>\n");
    }
    html.push_str(TAIL);
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_files_as_download_links() {
        let html = render_index(&["scan.docx".into(), "a b.docx".into()]);
        assert!(html.contains(r#"<a href="/download/scan.docx">scan.docx</a>"#));
        assert!(html.contains(r#"<a href="/download/a%20b.docx">a b.docx</a>"#));
    }

    #[test]
    fn names_are_escaped() {
        let html = render_index(&["<script>.docx".into()]);
        assert!(html.contains("&lt;script&gt;.docx"));
        assert!(!html.contains("<li><a href=\"/download/<script>"));
    }

    #[test]
    fn empty_listing() {
        assert!(render_index(&[]).contains("Nothing converted yet."));
    }
}
