use axum::response::Html;

/// Minimal upload/download page over the JSON API
pub async fn index() -> Html<&'static str> {
    Html(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>dropcode</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            max-width: 640px;
            margin: 0 auto;
            padding: 2rem;
            background: #f5f5f5;
        }
        section {
            background: white;
            padding: 1.5rem;
            margin-bottom: 1.5rem;
            border-radius: 8px;
            box-shadow: 0 2px 10px rgba(0,0,0,0.1);
        }
        #result { font-size: 1.5rem; font-weight: bold; letter-spacing: 0.2em; }
    </style>
</head>
<body>
    <section>
        <h1>Share a file</h1>
        <form id="upload">
            <input type="file" name="file" required>
            <button type="submit">Generate Sharing Code</button>
        </form>
        <p id="result"></p>
        <p>Codes expire automatically once the retention window passes.</p>
    </section>
    <section>
        <h1>Download</h1>
        <form id="download">
            <input name="code" placeholder="Enter 6-digit code" required>
            <button type="submit">Download</button>
        </form>
    </section>
    <script>
        document.getElementById('upload').addEventListener('submit', async (event) => {
            event.preventDefault();
            const result = document.getElementById('result');
            const { code } = await (await fetch('/api/code')).json();
            const form = new FormData(event.target);
            form.append('code', code);
            const response = await fetch('/api/upload', { method: 'POST', body: form });
            const body = await response.json();
            result.textContent = response.ok ? body.code : body.error;
        });
        document.getElementById('download').addEventListener('submit', (event) => {
            event.preventDefault();
            const code = new FormData(event.target).get('code').trim().toUpperCase();
            window.location.href = '/api/download/' + encodeURIComponent(code);
        });
    </script>
</body>
</html>
"#)
}
