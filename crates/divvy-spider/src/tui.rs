use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Total / successes / failures bars for one job; all hidden when `tui` is off.
pub(crate) struct Progress {
    _multi: Option<MultiProgress>,
    total: ProgressBar,
    success: ProgressBar,
    fails: ProgressBar,
}

impl Progress {
    pub(crate) fn new(len: usize, label: &str, tui: bool) -> anyhow::Result<Self> {
        if !tui {
            return Ok(Self {
                _multi: None,
                total: ProgressBar::hidden(),
                success: ProgressBar::hidden(),
                fails: ProgressBar::hidden(),
            });
        }

        // overall multi progress bar
        let multi = MultiProgress::new();

        // total number of targets to collect
        let total = multi.add(
            ProgressBar::new(len as u64).with_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.magenta}\n \
                            {msg:>9.white} |{bar:57.white/grey}| {pos:<2} / {human_len} \
                            ({percent_precise}%) [Time: {elapsed}, Rate: {per_sec}, ETA: {eta}]",
                    )?
                    .progress_chars("## "),
            ),
        );
        total.set_message(label.to_string());
        total.enable_steady_tick(Duration::from_millis(100));

        // targets fetched and handled
        let success = multi.insert_after(
            &total,
            ProgressBar::new(len as u64).with_style(
                ProgressStyle::default_bar()
                    .template(" {msg:>9.green} |{bar:57.green}| {pos:<2.green}")?
                    .progress_chars("## "),
            ),
        );
        success.set_message("successes");

        // targets that failed to fetch or decode
        let fails = multi.insert_after(
            &success,
            ProgressBar::new(len as u64).with_style(
                ProgressStyle::default_bar()
                    .template(" {msg:>9.red} |{bar:57.red}| {pos:<2.red}")?
                    .progress_chars("## "),
            ),
        );
        fails.set_message("failures");

        Ok(Self {
            _multi: Some(multi),
            total,
            success,
            fails,
        })
    }

    pub(crate) fn success(&self) {
        self.total.inc(1);
        self.success.inc(1);
    }

    pub(crate) fn fail(&self) {
        self.total.inc(1);
        self.fails.inc(1);
    }

    pub(crate) fn finish(&self) {
        self.total.finish_and_clear();
        self.success.finish_and_clear();
        self.fails.finish_and_clear();
    }
}
