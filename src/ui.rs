use crate::models::Theme;
use crate::timer::{TimerMode, TimerSnapshot};

pub fn render_index(timer: &TimerSnapshot, theme: Theme) -> String {
    let theme = match theme {
        Theme::Light => "light",
        Theme::Dark => "dark",
    };
    INDEX_HTML
        .replace("{{THEME}}", theme)
        .replace("{{TIME}}", &timer.display)
        .replace("{{MODE}}", timer.mode.as_str())
        .replace("{{TASK}}", &escape_html(&timer.task_label))
        .replace("{{FOCUS_MIN}}", &TimerMode::Work.preset_minutes().to_string())
        .replace("{{BREAK_MIN}}", &TimerMode::Break.preset_minutes().to_string())
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en" data-theme="{{THEME}}">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Study Assist</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --muted: #6b645d;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    [data-theme="dark"] {
      --bg-1: #1d2127;
      --bg-2: #2f4858;
      --ink: #f1ece4;
      --muted: #b3aca3;
      --card: rgba(36, 40, 48, 0.9);
      --shadow: 0 24px 60px rgba(0, 0, 0, 0.45);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), var(--bg-1) 60%, var(--bg-2) 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(920px, 100%);
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 28px;
      animation: rise 600ms ease;
    }

    header {
      display: flex;
      justify-content: space-between;
      align-items: center;
      gap: 12px;
    }

    h1, h2 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      margin: 0;
    }

    h1 {
      font-size: clamp(2rem, 4vw, 2.6rem);
    }

    nav {
      display: flex;
      gap: 8px;
      flex-wrap: wrap;
    }

    button, .tab {
      border: none;
      border-radius: 14px;
      padding: 10px 16px;
      font: inherit;
      cursor: pointer;
      background: var(--accent-2);
      color: #fff;
    }

    .tab[aria-selected="false"] {
      background: transparent;
      color: var(--ink);
      border: 1px solid var(--muted);
    }

    .badge {
      display: inline-block;
      min-width: 1.4em;
      margin-left: 4px;
      border-radius: 999px;
      background: var(--accent);
      color: #fff;
      font-size: 0.75rem;
      text-align: center;
    }

    section[hidden] {
      display: none;
    }

    .timer {
      display: grid;
      justify-items: center;
      gap: 18px;
    }

    .clock {
      font-size: clamp(3.5rem, 12vw, 6rem);
      font-variant-numeric: tabular-nums;
      letter-spacing: 0.04em;
    }

    .clock[data-mode="break"] {
      color: #3d7bd9;
    }

    .row {
      display: flex;
      gap: 10px;
      flex-wrap: wrap;
      justify-content: center;
    }

    input, select {
      font: inherit;
      padding: 10px 12px;
      border-radius: 12px;
      border: 1px solid var(--muted);
      background: transparent;
      color: var(--ink);
    }

    .done {
      padding: 14px 18px;
      border-radius: 16px;
      background: rgba(45, 122, 75, 0.14);
      color: #2d7a4b;
    }

    .grid {
      display: grid;
      grid-template-columns: repeat(7, 1fr);
      gap: 6px;
    }

    .cell {
      min-height: 64px;
      padding: 6px;
      border-radius: 12px;
      border: 1px solid rgba(107, 100, 93, 0.25);
      font-size: 0.85rem;
    }

    .cell.today {
      outline: 2px solid var(--accent);
    }

    .cards {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
      gap: 12px;
    }

    .card {
      padding: 14px;
      border-radius: 16px;
      border: 1px solid rgba(107, 100, 93, 0.25);
      display: grid;
      gap: 6px;
    }

    .stat .value {
      font-size: 2rem;
      font-weight: 600;
    }

    .label, .hint {
      color: var(--muted);
      font-size: 0.9rem;
    }

    .bar {
      height: 10px;
      border-radius: 6px;
      background: var(--accent);
    }

    .status {
      min-height: 1.2em;
      color: var(--muted);
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }

    @keyframes rise {
      from {
        opacity: 0;
        transform: translateY(18px);
      }
      to {
        opacity: 1;
        transform: translateY(0);
      }
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Study Assist</h1>
      <button id="theme-btn" type="button">Toggle theme</button>
    </header>

    <nav role="tablist">
      <button class="tab" data-tab="timer" aria-selected="true">Timer<span id="timer-dot"></span></button>
      <button class="tab" data-tab="calendar" aria-selected="false">Calendar<span id="test-badge"></span></button>
      <button class="tab" data-tab="archive" aria-selected="false">Archive<span id="archive-badge"></span></button>
      <button class="tab" data-tab="stats" aria-selected="false">Stats</button>
    </nav>

    <section id="panel-timer" class="timer">
      <div class="row">
        <button type="button" data-mode="work">Focus ({{FOCUS_MIN}} min)</button>
        <button type="button" data-mode="break">Break ({{BREAK_MIN}} min)</button>
      </div>
      <input id="task" type="text" value="{{TASK}}" placeholder="What are you studying?" />
      <div id="clock" class="clock" data-mode="{{MODE}}">{{TIME}}</div>
      <div id="done" class="done" hidden>Session complete! <button id="next-btn" type="button">Next</button></div>
      <div class="row">
        <button id="toggle-btn" type="button">Start</button>
        <button id="reset-btn" type="button">Reset</button>
      </div>
    </section>

    <section id="panel-calendar" hidden>
      <div class="row">
        <button id="prev-month" type="button">&lt;</button>
        <h2 id="month-title"></h2>
        <button id="next-month" type="button">&gt;</button>
      </div>
      <div id="month-grid" class="grid"></div>
      <form id="test-form" class="row">
        <input name="name" placeholder="Test name" required />
        <input name="subject" placeholder="Subject" />
        <input name="date" type="date" required />
        <input name="range" placeholder="Range, e.g. p.12-34" />
        <button type="submit">Add test</button>
      </form>
      <h2>Upcoming</h2>
      <div id="upcoming" class="cards"></div>
    </section>

    <section id="panel-archive" hidden>
      <form id="filter-form" class="row">
        <input name="school" placeholder="School" />
        <select name="subject">
          <option value="">All subjects</option>
          <option>Math</option><option>English</option><option>Japanese</option>
          <option>Science</option><option>Social Studies</option>
        </select>
        <input name="start_date" type="date" />
        <input name="end_date" type="date" />
        <button type="submit">Filter</button>
      </form>
      <form id="upload-form" class="row">
        <input name="file" type="file" required />
        <input name="school" placeholder="School" />
        <select name="subject">
          <option>Math</option><option>English</option><option>Japanese</option>
          <option>Science</option><option>Social Studies</option>
        </select>
        <select name="test_type">
          <option>Midterm</option><option>Final</option><option>Proficiency</option>
        </select>
        <input name="date" type="date" required />
        <input name="tags" placeholder="Tags, comma separated" />
        <button type="submit">Upload</button>
      </form>
      <div id="archives" class="cards"></div>
    </section>

    <section id="panel-stats" hidden>
      <div class="cards">
        <div class="card stat"><span class="label">Pomodoros today</span><span id="today-count" class="value">0</span></div>
        <div class="card stat"><span class="label">Minutes today</span><span id="today-minutes" class="value">0</span></div>
        <div class="card stat"><span class="label">Day streak</span><span id="streak" class="value">0</span></div>
      </div>
      <h2>Last 7 days</h2>
      <div id="week" class="cards"></div>
      <h2>This month</h2>
      <p id="month-summary" class="hint"></p>
      <h2>By task</h2>
      <div id="subjects" class="cards"></div>
    </section>

    <div class="status" id="status"></div>
  </main>
  <script>
    const $ = (id) => document.getElementById(id);
    const statusEl = $('status');
    let timer = null;
    let viewMonth = new Date();

    const setStatus = (message, type) => {
      statusEl.textContent = message;
      statusEl.dataset.type = type || '';
    };

    const escapeHtml = (value) => String(value).replace(/[&<>"']/g, (c) => ({
      '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;'
    })[c]);

    const api = async (path, options = {}) => {
      const init = { ...options };
      if (init.body !== undefined) {
        init.method = init.method || 'POST';
        init.headers = { 'Content-Type': 'application/json' };
        init.body = JSON.stringify(init.body);
      }
      const response = await fetch(path, init);
      if (!response.ok) {
        throw new Error(await response.text() || response.statusText);
      }
      return response.status === 204 ? null : response.json();
    };

    const post = (path, body = {}) => api(path, { body });

    const renderTimer = (snapshot) => {
      timer = snapshot;
      const clock = $('clock');
      clock.textContent = snapshot.display;
      clock.dataset.mode = snapshot.mode;
      $('toggle-btn').textContent = snapshot.running ? 'Pause' : 'Start';
      $('done').hidden = !snapshot.completed;
      $('task').hidden = snapshot.mode !== 'work';
      $('timer-dot').textContent = snapshot.running ? ' ●' : '';
      document.title = snapshot.running ? `${snapshot.display} · Study Assist` : 'Study Assist';
    };

    const refreshTimer = async () => renderTimer(await api('/api/timer'));

    const pollAlerts = async () => {
      const alerts = await api('/api/alerts');
      if ('Notification' in window && Notification.permission === 'granted') {
        alerts.forEach((alert) => new Notification(alert.title, { body: alert.body }));
      }
      if (alerts.length) {
        refreshStats().catch(() => {});
      }
    };

    const syncPermission = async () => {
      if (!('Notification' in window)) {
        return;
      }
      if (Notification.permission === 'default') {
        await Notification.requestPermission();
      }
      await post('/api/alerts/permission', { granted: Notification.permission === 'granted' });
    };

    const refreshNav = async () => {
      const nav = await api('/api/nav');
      $('test-badge').innerHTML = nav.urgent_test ? '<span class="badge">!</span>' : '';
      $('archive-badge').innerHTML = nav.archive_count ? `<span class="badge">${nav.archive_count}</span>` : '';
    };

    const refreshCalendar = async () => {
      const year = viewMonth.getFullYear();
      const month = viewMonth.getMonth() + 1;
      const data = await api(`/api/calendar?year=${year}&month=${month}`);
      $('month-title').textContent = `${data.year} / ${String(data.month).padStart(2, '0')}`;
      const head = data.weekdays.map((day) => `<div class="label">${day}</div>`).join('');
      const cells = data.cells.map((cell) => {
        if (!cell.date) {
          return '<div></div>';
        }
        const tests = cell.tests
          .map((test) => `<div>${escapeHtml(test.name)}</div>`)
          .join('');
        return `<div class="cell${cell.is_today ? ' today' : ''}"><strong>${cell.day}</strong>${tests}</div>`;
      }).join('');
      $('month-grid').innerHTML = head + cells;

      const upcoming = await api('/api/tests/upcoming');
      $('upcoming').innerHTML = upcoming.length
        ? upcoming.map((test) => `
          <div class="card">
            <span class="label">${test.emoji} ${escapeHtml(test.badge)}</span>
            <strong>${escapeHtml(test.name)}</strong>
            <span class="hint">${escapeHtml(test.date)} ${escapeHtml(test.range || '')}</span>
            <div class="row">
              <button type="button" data-remind="${test.id}">Remind</button>
              <button type="button" data-delete-test="${test.id}">Delete</button>
            </div>
          </div>`).join('')
        : '<p class="hint">No upcoming tests.</p>';
    };

    const refreshArchives = async () => {
      const params = new URLSearchParams(new FormData($('filter-form')));
      const archives = await api(`/api/archives?${params}`);
      $('archives').innerHTML = archives.length
        ? archives.map((item) => `
          <div class="card">
            <strong>${escapeHtml(item.file_name)}</strong>
            <span class="label">${escapeHtml(item.school)} · ${escapeHtml(item.subject)} · ${escapeHtml(item.test_type)}</span>
            <span class="hint">${escapeHtml(item.date)} ${item.tags.map((t) => '#' + escapeHtml(t)).join(' ')}</span>
            <div class="row">
              <a href="/api/archives/${item.id}/download">Download</a>
              <button type="button" data-delete-archive="${item.id}">Delete</button>
            </div>
          </div>`).join('')
        : '<p class="hint">No archived tests match.</p>';
    };

    const refreshStats = async () => {
      const stats = await api('/api/stats');
      $('today-count').textContent = stats.today.count;
      $('today-minutes').textContent = stats.today.total_minutes;
      $('streak').textContent = stats.streak;
      const max = Math.max(1, ...stats.last_7_days.map((day) => day.count));
      $('week').innerHTML = stats.last_7_days.map((day) => `
        <div class="card">
          <span class="label">${day.label} ${day.date.slice(5)}</span>
          <div class="bar" style="width:${(day.count / max) * 100}%"></div>
          <span>${day.count} · ${day.minutes} min</span>
        </div>`).join('');
      const m = stats.monthly;
      $('month-summary').textContent =
        `${m.total_count} pomodoros · ${m.total_minutes} min (${m.total_hours} h) · ${m.avg_per_day} per day`;
      $('subjects').innerHTML = stats.subjects.map((s) => `
        <div class="card"><strong>${escapeHtml(s.name)}</strong><span>${s.count} · ${s.minutes} min</span></div>`).join('');
    };

    const run = (promise) => promise.catch((err) => setStatus(err.message, 'error'));

    document.querySelectorAll('.tab').forEach((tab) => {
      tab.addEventListener('click', () => {
        document.querySelectorAll('.tab').forEach((other) => {
          const selected = other === tab;
          other.setAttribute('aria-selected', String(selected));
          $(`panel-${other.dataset.tab}`).hidden = !selected;
        });
        const loaders = { calendar: refreshCalendar, archive: refreshArchives, stats: refreshStats };
        if (loaders[tab.dataset.tab]) {
          run(loaders[tab.dataset.tab]());
        }
      });
    });

    document.querySelectorAll('button[data-mode]').forEach((btn) => {
      btn.addEventListener('click', () => run(post('/api/timer/mode', { mode: btn.dataset.mode }).then(renderTimer)));
    });

    $('toggle-btn').addEventListener('click', () => {
      const path = timer && timer.running ? '/api/timer/pause' : '/api/timer/start';
      run(post(path).then(renderTimer).then(syncPermission));
    });
    $('reset-btn').addEventListener('click', () => run(post('/api/timer/reset').then(renderTimer)));
    $('next-btn').addEventListener('click', () => run(post('/api/timer/reset').then(renderTimer)));
    $('task').addEventListener('change', (event) =>
      run(post('/api/timer/task', { task_name: event.target.value }).then(renderTimer)));

    $('theme-btn').addEventListener('click', () => run(post('/api/theme/toggle').then((body) => {
      document.documentElement.dataset.theme = body.theme;
    })));

    $('prev-month').addEventListener('click', () => {
      viewMonth = new Date(viewMonth.getFullYear(), viewMonth.getMonth() - 1, 1);
      run(refreshCalendar());
    });
    $('next-month').addEventListener('click', () => {
      viewMonth = new Date(viewMonth.getFullYear(), viewMonth.getMonth() + 1, 1);
      run(refreshCalendar());
    });

    $('test-form').addEventListener('submit', (event) => {
      event.preventDefault();
      const body = Object.fromEntries(new FormData(event.target));
      run(post('/api/tests', body).then(() => {
        event.target.reset();
        setStatus('Test added.', 'ok');
        return Promise.all([refreshCalendar(), refreshNav()]);
      }));
    });

    $('upcoming').addEventListener('click', (event) => {
      const remind = event.target.dataset.remind;
      const remove = event.target.dataset.deleteTest;
      if (remind) {
        run(post(`/api/tests/${remind}/remind`).then(() => setStatus('Reminder sent.', 'ok')));
      } else if (remove && confirm('Delete this test?')) {
        run(api(`/api/tests/${remove}`, { method: 'DELETE' }).then(() => Promise.all([refreshCalendar(), refreshNav()])));
      }
    });

    $('filter-form').addEventListener('submit', (event) => {
      event.preventDefault();
      run(refreshArchives());
    });

    $('upload-form').addEventListener('submit', (event) => {
      event.preventDefault();
      const form = new FormData(event.target);
      const file = form.get('file');
      if (file.size > 5 * 1024 * 1024) {
        setStatus('Files must be 5MB or smaller.', 'error');
        return;
      }
      const reader = new FileReader();
      reader.onload = () => run(post('/api/archives', {
        file_name: file.name,
        file_type: file.type,
        school: form.get('school'),
        subject: form.get('subject'),
        test_type: form.get('test_type'),
        date: form.get('date'),
        tags: form.get('tags'),
        file_data: reader.result
      }).then(() => {
        event.target.reset();
        setStatus('Archive saved.', 'ok');
        return Promise.all([refreshArchives(), refreshNav()]);
      }));
      reader.readAsDataURL(file);
    });

    $('archives').addEventListener('click', (event) => {
      const remove = event.target.dataset.deleteArchive;
      if (remove && confirm('Delete this archive?')) {
        run(api(`/api/archives/${remove}`, { method: 'DELETE' }).then(() => Promise.all([refreshArchives(), refreshNav()])));
      }
    });

    document.addEventListener('visibilitychange', () => {
      const state = document.visibilityState === 'hidden' ? 'hidden' : 'visible';
      run(post('/api/timer/visibility', { state }).then(renderTimer));
    });

    setInterval(() => run(refreshTimer().then(pollAlerts)), 1000);
    run(refreshTimer().then(refreshNav));
    if ('Notification' in window && Notification.permission === 'granted') {
      run(syncPermission());
    }
  </script>
</body>
</html>
"#;
