pub const STREAM_INDEX: &str = r#"<!DOCTYPE html>
<html>
<head><title>Camera Stream</title></head>
<body>
<h1>Camera Stream</h1>
<ul>
  <li><a href="snapshot.jpg">JPEG snapshot</a></li>
  <li><a href="stream.mjpg">MJPEG stream</a></li>
  <li><a href="stream.h264">H264 stream (raw)</a></li>
  <li><a href="player">H264 player</a></li>
</ul>
</body>
</html>
"#;

pub const PLAYER: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>Camera</title>
<script src="https://cdn.jsdelivr.net/npm/jmuxer@2.0.5/dist/jmuxer.min.js"></script>
<style>
  html, body { margin: 0; width: 100%; height: 100%; background: #000; overflow: hidden; }
  video, img { width: 100%; height: 100%; object-fit: contain; }
  img { display: none; }
  #status { position: fixed; top: 4px; left: 6px; color: #0f0; font: 12px monospace; }
</style>
</head>
<body>
<video id="player" muted autoplay playsinline></video>
<img id="snapshot" alt="snapshot">
<div id="status"></div>
<script>
const status = document.getElementById('status');

function pollSnapshots() {
  const video = document.getElementById('player');
  const img = document.getElementById('snapshot');
  video.style.display = 'none';
  img.style.display = 'block';
  status.textContent = 'snapshot mode';
  const refresh = () => { img.src = 'snapshot.jpg?t=' + Date.now(); };
  img.onload = () => setTimeout(refresh, 200);
  img.onerror = () => setTimeout(refresh, 1000);
  refresh();
}

async function playH264() {
  if (typeof JMuxer === 'undefined') {
    throw new Error('jmuxer unavailable');
  }
  const muxer = new JMuxer({ node: 'player', mode: 'video', flushingTime: 0, fps: 30, debug: false });
  const response = await fetch('stream.h264', { cache: 'no-store' });
  if (!response.ok || !response.body) {
    throw new Error('stream unavailable: ' + response.status);
  }
  const reader = response.body.getReader();
  let received = 0;
  for (;;) {
    const { value, done } = await reader.read();
    if (done) {
      break;
    }
    received += value.length;
    status.textContent = Math.round(received / 1024) + ' KB';
    muxer.feed({ video: value });
  }
  throw new Error('stream ended');
}

playH264().catch((err) => {
  console.warn(err);
  pollSnapshots();
});
</script>
</body>
</html>
"#;

const CONTROL_PANEL: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title}</title>
<style>
  body { font-family: sans-serif; margin: 1rem; background: #f4f4f4; }
  .row { display: flex; align-items: center; gap: .5rem; margin: .25rem 0; }
  .row label { width: 16rem; }
  #preview { max-width: 640px; width: 100%; background: #000; }
  #log { font: 12px monospace; white-space: pre-wrap; }
</style>
</head>
<body>
<h1>{title}</h1>
<div class="row">
  <label for="cam">Camera</label>
  <select id="cam"></select>
  <button id="reload">Reload</button>
  <button id="info">Device info</button>
</div>
<img id="preview" alt="preview">
<form id="controls"></form>
<button id="apply">Apply</button>
<div id="log"></div>
<script>
const baseUrl = "{base_url}";
const camSelect = document.getElementById('cam');
const form = document.getElementById('controls');
let cams = [];
const logBox = document.getElementById('log');

function logStatus(message) {
  logBox.textContent = new Date().toLocaleTimeString() + ' ' + message + '\n' + logBox.textContent;
}

async function api(path, options) {
  const response = await fetch(path, options);
  const data = await response.json();
  if (!response.ok) {
    throw new Error(data.error || ('HTTP ' + response.status));
  }
  return data;
}

function controlInput(ctrl) {
  if (ctrl.type === 'menu' && ctrl.menu.length) {
    const select = document.createElement('select');
    for (const item of ctrl.menu) {
      const option = document.createElement('option');
      option.value = item.value;
      option.textContent = item.label;
      option.selected = item.value === ctrl.value;
      select.appendChild(option);
    }
    return select;
  }
  const input = document.createElement('input');
  if (ctrl.type === 'bool') {
    input.type = 'checkbox';
    input.checked = ctrl.value === 1;
  } else {
    input.type = 'number';
    if (ctrl.min !== null) input.min = ctrl.min;
    if (ctrl.max !== null) input.max = ctrl.max;
    if (ctrl.step !== null) input.step = ctrl.step;
    input.value = ctrl.value ?? ctrl.default ?? 0;
  }
  return input;
}

async function loadControls() {
  form.innerHTML = '';
  try {
    const data = await api('/api/v4l2/ctrls?cam=' + encodeURIComponent(camSelect.value));
    for (const ctrl of data.controls) {
      const row = document.createElement('div');
      row.className = 'row';
      const label = document.createElement('label');
      label.textContent = ctrl.name;
      const input = controlInput(ctrl);
      input.name = ctrl.name;
      input.dataset.initial = input.type === 'checkbox' ? String(input.checked) : input.value;
      row.append(label, input);
      form.appendChild(row);
    }
    logStatus('loaded ' + data.controls.length + ' controls');
  } catch (err) {
    logStatus('Error: ' + err.message);
  }
}

async function applyControls() {
  const changes = {};
  for (const input of form.querySelectorAll('input, select')) {
    const current = input.type === 'checkbox' ? String(input.checked) : input.value;
    if (current === input.dataset.initial) continue;
    changes[input.name] = input.type === 'checkbox' ? (input.checked ? 1 : 0) : parseInt(input.value, 10);
  }
  if (!Object.keys(changes).length) {
    logStatus('nothing changed');
    return;
  }
  try {
    const data = await api('/api/v4l2/set?cam=' + encodeURIComponent(camSelect.value), {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify(changes),
    });
    logStatus('applied ' + JSON.stringify(data.applied));
    await loadControls();
  } catch (err) {
    logStatus('Error: ' + err.message);
  }
}

async function showInfo() {
  try {
    const data = await api('/api/v4l2/info?cam=' + encodeURIComponent(camSelect.value));
    logStatus(data.info);
  } catch (err) {
    logStatus('Error: ' + err.message);
  }
}

function updatePreview() {
  const preview = document.getElementById('preview');
  const camInfo = cams.find((c) => c.cam === camSelect.value);
  if (!baseUrl || !camInfo) {
    preview.removeAttribute('src');
    return;
  }
  preview.src = baseUrl.replace(/\/+$/, '') + camInfo.prefix + 'stream.mjpg';
}

function selectCamera() {
  updatePreview();
  return loadControls();
}

async function init() {
  cams = await api('/api/cams');
  for (const cam of cams) {
    const option = document.createElement('option');
    option.value = cam.cam;
    option.textContent = cam.cam + ' (' + cam.device + ')';
    camSelect.appendChild(option);
  }
  await selectCamera();
}

camSelect.addEventListener('change', selectCamera);
document.getElementById('reload').addEventListener('click', loadControls);
document.getElementById('info').addEventListener('click', showInfo);
document.getElementById('apply').addEventListener('click', applyControls);
init().catch((err) => logStatus('Error: ' + err.message));
</script>
</body>
</html>
"#;

/// Renders the control panel with the page title and preview base URL.
pub fn control_panel(title: &str, stream_url_base: &str) -> String {
    fill(
        CONTROL_PANEL,
        &[
            ("{title}", escape_html(title)),
            ("{base_url}", escape_js(stream_url_base)),
        ],
    )
}

/// Substitutes placeholders in one pass, so substituted text is never
/// scanned again.
fn fill(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match values.iter().find(|(key, _)| tail.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_js(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '<' => out.push_str("\\u003c"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}
