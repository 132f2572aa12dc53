/// Control page served at `/`. Polls each started task every two seconds
/// until it reaches a terminal status.
pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>amdl-ng</title>
<style>
  body { font-family: system-ui, sans-serif; background: #f3f4f8; margin: 0; padding: 24px; }
  main { max-width: 760px; margin: 0 auto; background: #fff; border-radius: 12px; padding: 28px; }
  h1 { margin-top: 0; }
  label { display: block; font-weight: 600; margin: 16px 0 6px; }
  input, select { width: 100%; padding: 10px; border: 1px solid #ccd; border-radius: 8px; font-size: 15px; }
  button { margin-top: 18px; padding: 12px 20px; border: 0; border-radius: 8px; background: #4c5fd5; color: #fff; font-size: 15px; cursor: pointer; }
  button:disabled { opacity: .6; cursor: not-allowed; }
  .task { border-left: 4px solid #4c5fd5; background: #f7f8fb; border-radius: 8px; padding: 14px; margin-top: 12px; }
  .head { display: flex; justify-content: space-between; gap: 12px; }
  .status { font-size: 12px; font-weight: 700; text-transform: uppercase; padding: 3px 10px; border-radius: 12px; }
  .pending { background: #fde9a9; } .processing { background: #9cc7ff; }
  .completed { background: #8fdcc2; } .failed { background: #f5b3a3; }
  .bar { height: 8px; background: #e2e4ea; border-radius: 4px; margin: 10px 0; overflow: hidden; }
  .fill { height: 100%; background: #4c5fd5; transition: width .3s; }
  .msg { color: #555; font-size: 14px; }
</style>
</head>
<body>
<main>
  <h1>amdl-ng</h1>
  <form id="form">
    <label for="url">Apple Music URL</label>
    <input type="url" id="url" placeholder="https://music.apple.com/..." required>
    <label for="quality">Audio quality</label>
    <select id="quality">
      <option value="alac">Lossless (ALAC)</option>
      <option value="aac">AAC</option>
      <option value="atmos">Dolby Atmos</option>
    </select>
    <button type="submit" id="submit">Start download</button>
  </form>
  <h3>Tasks <button type="button" onclick="loadTasks()">Refresh</button></h3>
  <div id="tasks"></div>
</main>
<script>
const polling = new Set();

function esc(s) {
  const d = document.createElement('div');
  d.textContent = s == null ? '' : String(s);
  return d.innerHTML;
}

function render(task) {
  let el = document.getElementById('task-' + task.id);
  if (!el) {
    el = document.createElement('div');
    el.className = 'task';
    el.id = 'task-' + task.id;
    document.getElementById('tasks').prepend(el);
  }
  el.innerHTML =
    '<div class="head"><strong>' + esc(task.type) + ' - ' + esc(task.url) + '</strong>' +
    '<span class="status ' + esc(task.status) + '">' + esc(task.status) + '</span></div>' +
    '<div class="bar"><div class="fill" style="width:' + Number(task.progress) + '%"></div></div>' +
    '<div class="msg">' + esc(task.message) + '</div>' +
    '<small>Created: ' + esc(new Date(task.created_at).toLocaleString()) + '</small>';
}

function terminal(task) {
  return task.status === 'completed' || task.status === 'failed';
}

function poll(id) {
  if (polling.has(id)) return;
  polling.add(id);
  const timer = setInterval(async () => {
    try {
      const res = await fetch('/api/status?task_id=' + encodeURIComponent(id));
      if (!res.ok) { clearInterval(timer); polling.delete(id); return; }
      const task = await res.json();
      render(task);
      if (terminal(task)) { clearInterval(timer); polling.delete(id); }
    } catch (e) {
      console.error('status poll failed', e);
    }
  }, 2000);
}

async function loadTasks() {
  const res = await fetch('/api/tasks');
  if (!res.ok) return;
  const tasks = await res.json();
  document.getElementById('tasks').innerHTML = tasks.length ? '' : '<p>No tasks yet.</p>';
  tasks.forEach(task => { render(task); if (!terminal(task)) poll(task.id); });
}

document.getElementById('form').addEventListener('submit', async (e) => {
  e.preventDefault();
  const button = document.getElementById('submit');
  button.disabled = true;
  try {
    const res = await fetch('/api/download', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify({
        url: document.getElementById('url').value,
        quality: document.getElementById('quality').value,
      }),
    });
    const data = await res.json();
    if (!res.ok) { alert('Error: ' + data.error); return; }
    document.getElementById('url').value = '';
    await loadTasks();
    poll(data.task_id);
  } catch (err) {
    alert('Error: ' + err.message);
  } finally {
    button.disabled = false;
  }
});

document.addEventListener('DOMContentLoaded', loadTasks);
</script>
</body>
</html>
"#;
